//! Timeslot turns irregular, punctual observations into calendar-correct slots.
//!
//! Overview
//! - Keeps points (instants) and slots (`[start, end)` intervals with a
//!   coverage ratio) apart: a [`Series`] holds one kind for its whole life.
//! - [`TimeUnit`] knows that "1 day" is 23 or 25 hours across a DST switch
//!   and that "1 month" is 28 to 31 days; slot boundaries are computed on the
//!   series' local wall clock.
//! - [`GapDetector`] infers the nominal sampling interval and flags missing
//!   or under-covered regions.
//! - [`Resampler`] slots points or re-slots slots into coarser units,
//!   reporting coverage and validity per output slot.
//! - [`Pipeline`] chains [`Operation`]s and [`Model`] steps, checking every
//!   model's [`InputContract`] and normalizing its input when allowed.
//!
//! Key behaviors and trade-offs
//! - Upsampling is refused (`UpsamplingNotSupported`) instead of inventing
//!   data; re-slotting to the series' own unit only re-validates coverage.
//! - Under-covered slots are kept and marked invalid; [`FillPolicy`] decides
//!   whether their partial values are kept, dropped or interpolated.
//! - Calendar units make unit comparison contextual: use
//!   [`TimeUnit::cmp_at`] with an anchor when a unit may be calendar-based.
//!
//! Examples
//! Slotting minute samples into hourly means and feeding a model:
//! ```rust,ignore
//! use std::sync::Arc;
//! use timeslot::{Pipeline, GapAnnotator, Resampler, TimeUnit};
//!
//! let hourly: TimeUnit = "1h".parse()?;
//! let pipeline = Pipeline::builder()
//!     .then(Arc::new(GapAnnotator::default()))
//!     .then(Arc::new(Resampler::new(hourly)))
//!     .model(Arc::new(my_forecaster))
//!     .build()?;
//! let forecast = pipeline.run(&series)?;
//! ```
//!
//! See `demos/examples/` for runnable end-to-end demonstrations.
#![warn(missing_docs)]

mod pipeline;

pub use pipeline::{Pipeline, PipelineBuilder, StepInfo};

// Re-export core types for convenience
pub use timeslot_core::{
    // Data model
    Item,
    Iter,
    Point,
    Schema,
    Series,
    Slot,
    // Units
    Boundaries,
    TimeUnit,
    Tz,
    UnitBase,
    // Gaps
    Gap,
    GapDetector,
    GapKind,
    GapReport,
    detect_gaps,
    estimate_step_seconds,
    is_subdaily,
    lower_median_step_seconds,
    // Ingestion
    PointRow,
    SlotRow,
    ingest_points,
    ingest_slots,
    // Reduction and resampling
    Contribution,
    Reducer,
    ReducerRegistry,
    Resampler,
    resample,
    reslot,
    // Operations and models
    GapAnnotator,
    InputContract,
    Model,
    Operation,
    Slice,
    periodicity_index,
    validate_input,
    validate_input_with,
};

pub use timeslot_types::{
    AggregationPolicy, CoveragePolicy, FillPolicy, GapConfig, IntervalEstimator, PipelineConfig,
    SeriesKind, SeriesKinds, TimeslotError,
};
