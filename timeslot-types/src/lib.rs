//! Timeslot error taxonomy, series-kind flags and configuration primitives.
#![warn(missing_docs)]

mod config;
mod error;
mod kind;

pub use config::{
    AggregationPolicy, CoveragePolicy, FillPolicy, GapConfig, IntervalEstimator, PipelineConfig,
};
pub use error::TimeslotError;
pub use kind::{SeriesKind, SeriesKinds};
