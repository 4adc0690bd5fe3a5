use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the timeslot workspace.
///
/// Every core operation is a pure function of its input, so none of these
/// errors is retried internally: the same input always yields the same error.
/// Each variant carries enough context (indices, offending timestamps, unit
/// names) to diagnose the failure without re-running the call.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TimeslotError {
    /// A time unit was built with a non-positive magnitude or an unknown base token.
    #[error("invalid time unit: {0}")]
    InvalidUnit(String),

    /// Ordering, duplication or schema violation while building a series.
    #[error("malformed series at item {index}: {reason}")]
    MalformedSeries {
        /// Zero-based index of the offending item.
        index: usize,
        /// Human-readable description, including the offending timestamp(s).
        reason: String,
    },

    /// Too few items to infer a sampling interval.
    #[error("insufficient data: need at least {required} items, got {got}")]
    InsufficientData {
        /// Minimum number of items required by the operation.
        required: usize,
        /// Number of items actually present.
        got: usize,
    },

    /// The requested target unit is finer than the nominal sampling of the source.
    #[error("upsampling not supported: target unit {target} is finer than nominal unit {nominal}")]
    UpsamplingNotSupported {
        /// Requested target unit, canonical form (e.g. "30s").
        target: String,
        /// Nominal unit of the source series.
        nominal: String,
    },

    /// An aggregation policy referenced a reducer that is not registered.
    #[error("unknown aggregation: {0}")]
    UnknownAggregation(String),

    /// A model's input contract is not satisfied by the provided series.
    #[error("contract violation for {model}: {reason}")]
    ContractViolation {
        /// Name of the model whose contract was checked.
        model: String,
        /// First violated requirement.
        reason: String,
    },

    /// Invalid configuration value or argument.
    #[error("invalid argument: {0}")]
    InvalidArg(String),
}

impl TimeslotError {
    /// Helper: build a `MalformedSeries` error for the item at `index`.
    pub fn malformed(index: usize, reason: impl Into<String>) -> Self {
        Self::MalformedSeries {
            index,
            reason: reason.into(),
        }
    }

    /// Helper: build a `ContractViolation` error.
    pub fn contract(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ContractViolation {
            model: model.into(),
            reason: reason.into(),
        }
    }

    /// Helper: build an `UpsamplingNotSupported` error from displayable units.
    pub fn upsampling(target: impl ToString, nominal: impl ToString) -> Self {
        Self::UpsamplingNotSupported {
            target: target.to_string(),
            nominal: nominal.to_string(),
        }
    }

    /// Helper: build an `InsufficientData` error.
    #[must_use]
    pub const fn insufficient(required: usize, got: usize) -> Self {
        Self::InsufficientData { required, got }
    }

    /// Returns true if the failure is structural (unit, schema or ordering).
    ///
    /// Structural failures abort a whole resampling call; coverage shortfalls
    /// never surface as errors and are reported per slot instead.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::InvalidUnit(_) | Self::MalformedSeries { .. } | Self::UnknownAggregation(_)
        )
    }
}
