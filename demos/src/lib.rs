//! Shared helpers for the runnable timeslot demos.

pub mod common;
