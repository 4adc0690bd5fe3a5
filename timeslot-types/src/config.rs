//! Configuration types shared across the engine, operations and pipelines.

use std::collections::BTreeMap;

use crate::TimeslotError;
use serde::{Deserialize, Serialize};

/// Strategy for inferring the nominal sampling interval from adjacent deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub enum IntervalEstimator {
    /// Most frequent positive delta; falls back to the lower median when no
    /// unique mode exists.
    #[default]
    ModeThenLowerMedian,
    /// Lower median of the positive deltas.
    LowerMedian,
}

/// Configuration for gap detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapConfig {
    /// A delta is a gap when it exceeds `nominal * tolerance`. Must be >= 1.
    pub tolerance: f64,
    /// Slots whose coverage falls below this ratio are reported as gaps.
    pub min_slot_coverage: f64,
    /// How the nominal interval is inferred when the series declares none.
    pub estimator: IntervalEstimator,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            tolerance: 1.5,
            min_slot_coverage: 0.5,
            estimator: IntervalEstimator::default(),
        }
    }
}

impl GapConfig {
    /// Replace the tolerance factor.
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Check value ranges.
    ///
    /// # Errors
    /// Returns `InvalidArg` if `tolerance` is not a finite number >= 1 or if
    /// `min_slot_coverage` lies outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), TimeslotError> {
        if !self.tolerance.is_finite() || self.tolerance < 1.0 {
            return Err(TimeslotError::InvalidArg(format!(
                "gap tolerance must be a finite factor >= 1 (got {})",
                self.tolerance
            )));
        }
        check_ratio("min_slot_coverage", self.min_slot_coverage)
    }
}

/// What to place in a destination slot whose coverage is under the minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub enum FillPolicy {
    /// Keep whatever the partial data aggregated to; the slot is still invalid.
    #[default]
    KeepPartial,
    /// Drop the values: every value of the slot becomes missing.
    Missing,
    /// Linearly interpolate from the nearest valid neighbouring slots and mark
    /// the slot as reconstructed.
    Interpolate,
}

/// Coverage requirements for destination slots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoveragePolicy {
    /// Minimum coverage ratio in `[0, 1]` for a slot to be valid.
    pub min_coverage: f64,
    /// Fill behaviour for slots under `min_coverage`.
    pub fill: FillPolicy,
    /// Synthesize virtual points at slot boundaries by linear interpolation
    /// between the bracketing points.
    pub interpolate_boundaries: bool,
}

impl Default for CoveragePolicy {
    fn default() -> Self {
        Self {
            min_coverage: 0.5,
            fill: FillPolicy::default(),
            interpolate_boundaries: true,
        }
    }
}

impl CoveragePolicy {
    /// Policy with the given minimum coverage and default fill.
    #[must_use]
    pub fn with_min_coverage(min_coverage: f64) -> Self {
        Self {
            min_coverage,
            ..Self::default()
        }
    }

    /// Replace the fill policy.
    #[must_use]
    pub const fn fill(mut self, fill: FillPolicy) -> Self {
        self.fill = fill;
        self
    }

    /// Enable or disable boundary interpolation.
    #[must_use]
    pub const fn interpolate_boundaries(mut self, yes: bool) -> Self {
        self.interpolate_boundaries = yes;
        self
    }

    /// Check value ranges.
    ///
    /// # Errors
    /// Returns `InvalidArg` if `min_coverage` lies outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), TimeslotError> {
        check_ratio("min_coverage", self.min_coverage)
    }
}

/// Named reducers to apply per value when several source items collapse into
/// one destination slot.
///
/// Names are resolved against a reducer registry at resampling time; an
/// unknown name fails the call with `UnknownAggregation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationPolicy {
    default: String,
    #[serde(default)]
    per_value: BTreeMap<String, String>,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self::new("mean")
    }
}

impl AggregationPolicy {
    /// Policy applying `reducer` to every value.
    pub fn new(reducer: impl Into<String>) -> Self {
        Self {
            default: reducer.into(),
            per_value: BTreeMap::new(),
        }
    }

    /// Replace the default reducer.
    #[must_use]
    pub fn with_default(mut self, reducer: impl Into<String>) -> Self {
        self.default = reducer.into();
        self
    }

    /// Override the reducer for a single value name.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>, reducer: impl Into<String>) -> Self {
        self.per_value.insert(value.into(), reducer.into());
        self
    }

    /// Default reducer name.
    #[must_use]
    pub fn default_reducer(&self) -> &str {
        &self.default
    }

    /// Reducer name for `value`, falling back to the default.
    #[must_use]
    pub fn reducer_for(&self, value: &str) -> &str {
        self.per_value
            .get(value)
            .map_or(self.default.as_str(), String::as_str)
    }

    /// Per-value overrides, ordered by value name.
    pub fn overrides(&self) -> impl Iterator<Item = (&str, &str)> {
        self.per_value
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Global configuration for a processing pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Re-check series invariants on the output of every step.
    pub validate_steps: bool,
    /// When a model rejects its input, try to resample the input to the
    /// model's declared interval before giving up.
    pub normalize_for_models: bool,
    /// Gap detection settings used by model steps and normalization.
    pub gap: GapConfig,
    /// Coverage policy applied when normalizing input for a model.
    pub normalize_coverage: CoveragePolicy,
    /// Aggregation applied when normalizing input for a model.
    pub normalize_aggregation: AggregationPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            validate_steps: true,
            normalize_for_models: true,
            gap: GapConfig::default(),
            normalize_coverage: CoveragePolicy::default(),
            normalize_aggregation: AggregationPolicy::default(),
        }
    }
}

fn check_ratio(what: &str, v: f64) -> Result<(), TimeslotError> {
    if (0.0..=1.0).contains(&v) {
        Ok(())
    } else {
        Err(TimeslotError::InvalidArg(format!(
            "{what} must be within [0, 1] (got {v})"
        )))
    }
}
