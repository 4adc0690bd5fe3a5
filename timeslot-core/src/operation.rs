use chrono::{DateTime, Utc};

use crate::gaps::GapDetector;
use crate::series::Series;
use crate::{GapConfig, TimeslotError};

/// A pure `Series -> Series` transform.
///
/// Implementations must not mutate shared state and must return a series
/// that satisfies every construction invariant; pipelines re-check the
/// output with [`Series::check_invariants`] when step validation is on.
pub trait Operation: Send + Sync {
    /// Human-readable operation name for introspection/logging.
    fn name(&self) -> &'static str;

    /// Apply the transform.
    ///
    /// # Errors
    /// Whatever the operation reports; the input is left untouched.
    fn apply(&self, series: &Series) -> Result<Series, TimeslotError>;

    /// Opaque configuration snapshot for serialization/inspection.
    fn config_json(&self) -> serde_json::Value;
}

/// Runs gap detection and attaches the report to the series.
#[derive(Debug, Clone, Copy, Default)]
pub struct GapAnnotator {
    detector: GapDetector,
}

impl GapAnnotator {
    /// Annotator using `config`.
    #[must_use]
    pub const fn new(config: GapConfig) -> Self {
        Self {
            detector: GapDetector::new(config),
        }
    }
}

impl Operation for GapAnnotator {
    fn name(&self) -> &'static str {
        "GapAnnotator"
    }

    fn apply(&self, series: &Series) -> Result<Series, TimeslotError> {
        let report = self.detector.detect(series)?;
        Ok(series.clone().with_gaps(report))
    }

    fn config_json(&self) -> serde_json::Value {
        serde_json::to_value(self.detector.config()).unwrap_or_default()
    }
}

/// Keeps the items whose instant falls in `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl Slice {
    /// Slice over `[from, to)`.
    ///
    /// # Errors
    /// Returns `InvalidArg` if `to` is before `from`.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, TimeslotError> {
        if to < from {
            return Err(TimeslotError::InvalidArg(format!(
                "slice end {to} is before start {from}"
            )));
        }
        Ok(Self { from, to })
    }
}

impl Operation for Slice {
    fn name(&self) -> &'static str {
        "Slice"
    }

    fn apply(&self, series: &Series) -> Result<Series, TimeslotError> {
        Ok(series.slice(self.from, self.to))
    }

    fn config_json(&self) -> serde_json::Value {
        serde_json::json!({
            "from": self.from.to_rfc3339(),
            "to": self.to.to_rfc3339(),
        })
    }
}
