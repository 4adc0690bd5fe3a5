use chrono::{DateTime, TimeDelta, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use timeslot_core::{Point, Schema, Series, TimeslotError};

fn climate_schema() -> Result<Schema, TimeslotError> {
    Schema::new(["temp", "hum"])
}

#[allow(clippy::cast_precision_loss)]
fn climate(i: usize) -> Vec<Option<f64>> {
    let hour = (i % 24) as f64;
    vec![Some(15.0 + hour * 0.5), Some(60.0 - (i % 10) as f64)]
}

fn at(start: DateTime<Utc>, i: usize, step_secs: i64) -> Result<DateTime<Utc>, TimeslotError> {
    i64::try_from(i)
        .ok()
        .and_then(|i| i.checked_mul(step_secs))
        .and_then(TimeDelta::try_seconds)
        .and_then(|d| start.checked_add_signed(d))
        .ok_or_else(|| TimeslotError::InvalidArg(format!("sample {i} is out of range")))
}

/// `n` climate samples (`temp`, `hum`) every `step_secs` from `start`, in UTC.
///
/// # Errors
/// `InvalidArg` for a non-positive step or out-of-range instants.
pub fn regular_points(start: DateTime<Utc>, n: usize, step_secs: i64) -> Result<Series, TimeslotError> {
    points_with_missing(start, n, step_secs, &[])
}

/// As [`regular_points`], without the samples at positions `missing`.
///
/// # Errors
/// `InvalidArg` for a non-positive step or out-of-range instants.
pub fn points_with_missing(
    start: DateTime<Utc>,
    n: usize,
    step_secs: i64,
    missing: &[usize],
) -> Result<Series, TimeslotError> {
    if step_secs <= 0 {
        return Err(TimeslotError::InvalidArg(format!("step must be positive (got {step_secs})")));
    }
    let points = (0..n)
        .filter(|i| !missing.contains(i))
        .map(|i| Ok(Point::new(at(start, i, step_secs)?, climate(i))))
        .collect::<Result<Vec<_>, TimeslotError>>()?;
    Ok(Series::from_points(climate_schema()?, points, chrono_tz::UTC)?.with_title("climate"))
}

/// Four irregular samples of `v` at 0s, 45s, 61s and 130s after the epoch.
///
/// # Errors
/// Never in practice; construction errors are propagated.
pub fn irregular_points() -> Result<Series, TimeslotError> {
    let points = [(0, 10.0), (45, 12.0), (61, 11.0), (130, 9.0)]
        .into_iter()
        .map(|(s, v)| {
            DateTime::from_timestamp(s, 0)
                .map(|ts| Point::single(ts, v))
                .ok_or_else(|| TimeslotError::InvalidArg(format!("timestamp {s} is out of range")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Series::from_points(Schema::single("v")?, points, chrono_tz::UTC)
}

/// Seeded sensor readings of `v`: nominally every `step_secs`, each instant
/// moved by up to `jitter_secs` either way and each sample dropped with
/// probability `drop_ratio`. Values hover around 10.
///
/// The same seed always yields the same series.
///
/// # Errors
/// `InvalidArg` for a non-positive step, a jitter of half a step or more,
/// or a `drop_ratio` outside `[0, 1]`.
pub fn noisy_points(
    seed: u64,
    start: DateTime<Utc>,
    n: usize,
    step_secs: i64,
    jitter_secs: i64,
    drop_ratio: f64,
) -> Result<Series, TimeslotError> {
    if step_secs <= 0 || jitter_secs < 0 || jitter_secs * 2 >= step_secs {
        return Err(TimeslotError::InvalidArg(format!(
            "jitter {jitter_secs}s must stay below half the {step_secs}s step"
        )));
    }
    if !(0.0..=1.0).contains(&drop_ratio) {
        return Err(TimeslotError::InvalidArg(format!(
            "drop ratio must be within [0, 1] (got {drop_ratio})"
        )));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(n);
    for i in 0..n {
        let jitter = rng.random_range(-jitter_secs..=jitter_secs);
        let value = 10.0 + rng.random_range(-1.0..1.0);
        if rng.random_bool(drop_ratio) {
            continue;
        }
        let ts = at(start, i, step_secs)? + TimeDelta::seconds(jitter);
        points.push(Point::single(ts, value));
    }
    Ok(Series::from_points(Schema::single("v")?, points, chrono_tz::UTC)?.with_title("noisy sensor"))
}
