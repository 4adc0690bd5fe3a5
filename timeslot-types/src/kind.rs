use core::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Kind of items a series holds for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeriesKind {
    /// Punctual, zero-width observations.
    Points,
    /// Interval-based aggregated observations.
    Slots,
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Points => "points",
            Self::Slots => "slots",
        })
    }
}

bitflags! {
    /// Set of series kinds accepted by a model or operation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SeriesKinds: u8 {
        /// Accepts points-kind series.
        const POINTS = 0b01;
        /// Accepts slots-kind series.
        const SLOTS = 0b10;
    }
}

impl SeriesKinds {
    /// Whether `kind` is part of this set.
    #[must_use]
    pub const fn accepts(self, kind: SeriesKind) -> bool {
        match kind {
            SeriesKind::Points => self.contains(Self::POINTS),
            SeriesKind::Slots => self.contains(Self::SLOTS),
        }
    }
}

impl From<SeriesKind> for SeriesKinds {
    fn from(kind: SeriesKind) -> Self {
        match kind {
            SeriesKind::Points => Self::POINTS,
            SeriesKind::Slots => Self::SLOTS,
        }
    }
}
