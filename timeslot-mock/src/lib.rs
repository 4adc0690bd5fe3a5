//! Deterministic fixture series and a scriptable [`Model`](timeslot_core::Model)
//! for CI-safe tests and examples.

mod fixtures;
mod model;

pub use fixtures::points::{irregular_points, noisy_points, points_with_missing, regular_points};
pub use fixtures::slots::hourly_slots;
pub use fixtures::{FIXTURE_NAMES, by_name};
pub use model::{MockModel, ModelBehavior};
