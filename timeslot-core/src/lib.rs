//! timeslot-core
//!
//! Time-series data model and the calendar-aware resampling engine shared by
//! the timeslot ecosystem.
//!
//! - `unit`: fixed and calendar time units with DST-aware arithmetic.
//! - `series`: points, slots and the immutable `Series` container.
//! - `ingest`: raw row ingestion with eager validation.
//! - `gaps`: sampling interval inference and gap detection.
//! - `reduce`: named reducers and the reducer registry.
//! - `resample`: the resampler/slotter producing uniform slot series.
//! - `operation`: the `Operation` trait and built-in operations.
//! - `contract`: model input contracts and the `Model` trait.
//!
//! Every operation is a pure function of its input: a `Series` is read-only
//! once built and every transform returns a new one.
//!
//! Features
//! --------
//! - `tracing`: instrument public entry points with `tracing` spans/events.
//! - `parallel`: compute destination slots in parallel with `rayon`.
#![warn(missing_docs)]

/// Model input contracts and the `Model` trait.
pub mod contract;
/// Sampling interval inference and gap detection.
pub mod gaps;
/// Raw row ingestion.
pub mod ingest;
/// Series → Series operations.
pub mod operation;
/// Named reducers used when several source items collapse into one slot.
pub mod reduce;
/// Resampling and re-slotting.
pub mod resample;
pub mod series;
pub mod unit;

pub use contract::{InputContract, Model, periodicity_index, validate_input, validate_input_with};
pub use gaps::{
    Gap, GapDetector, GapKind, GapReport, detect_gaps, estimate_step_seconds, is_subdaily,
    lower_median_step_seconds,
};
pub use ingest::{PointRow, SlotRow, ingest_points, ingest_slots};
pub use operation::{GapAnnotator, Operation, Slice};
pub use reduce::{Contribution, Reducer, ReducerRegistry};
pub use resample::{Resampler, resample, reslot};
pub use series::{Item, Iter, Point, Schema, Series, Slot};
pub use unit::{Boundaries, TimeUnit, UnitBase};

pub use chrono_tz::Tz;
pub use timeslot_types::{
    AggregationPolicy, CoveragePolicy, FillPolicy, GapConfig, IntervalEstimator, PipelineConfig,
    SeriesKind, SeriesKinds, TimeslotError,
};
