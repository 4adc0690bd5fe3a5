//! Sampling interval inference and gap detection.

use core::cmp::Ordering;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::series::Series;
use crate::unit::TimeUnit;
use crate::{GapConfig, IntervalEstimator, SeriesKind, TimeslotError};

const DAY_MS: i64 = 86_400_000;

/// Cadences, in seconds, that an estimate without a unique mode snaps to.
const CADENCES: [i64; 21] = [
    1, 2, 5, 10, 15, 20, 30, 60, 120, 300, 600, 900, 1_200, 1_800, 3_600, 7_200, 10_800, 14_400,
    21_600, 43_200, 86_400,
];

/// Estimate a representative step (in seconds) from positive adjacent deltas.
///
/// Prefer the mode (most frequent positive delta); if there is no unique
/// mode, return the lower median so the result is an observed cadence and
/// never overstates the interval. Deltas are compared at millisecond
/// precision and the estimate is rounded up to whole seconds, so a 500 ms
/// cadence estimates to 1.
///
/// ```
/// use chrono::DateTime;
/// use timeslot_core::estimate_step_seconds;
///
/// let ts = |v: &[i64]| v.iter().map(|&s| DateTime::from_timestamp(s, 0).unwrap()).collect::<Vec<_>>();
/// // Deltas 60,60,60,120,180: unique mode is 60.
/// assert_eq!(estimate_step_seconds(&ts(&[0, 60, 120, 180, 300, 480])), Some(60));
/// // Deltas 60,60,120,120: no unique mode, lower median is 60.
/// assert_eq!(estimate_step_seconds(&ts(&[0, 60, 120, 240, 360])), Some(60));
/// ```
///
/// Input order does not matter and duplicates are ignored. Returns `None` if
/// fewer than two distinct instants are present.
#[must_use]
pub fn estimate_step_seconds(instants: &[DateTime<Utc>]) -> Option<i64> {
    mode_or_lower_median(&positive_deltas(instants)).map(ceil_secs)
}

fn mode_or_lower_median(sorted: &[i64]) -> Option<i64> {
    unique_mode(sorted).or_else(|| lower_median(sorted))
}

fn unique_mode(sorted: &[i64]) -> Option<i64> {
    let first = *sorted.first()?;

    let mut best = first;
    let mut best_count = 0usize;
    let mut ties = 0usize;
    let mut run = first;
    let mut run_count = 0usize;
    // The sentinel closes the last run.
    for &d in sorted.iter().chain(core::iter::once(&i64::MIN)) {
        if d == run {
            run_count += 1;
            continue;
        }
        match run_count.cmp(&best_count) {
            Ordering::Greater => {
                best = run;
                best_count = run_count;
                ties = 1;
            }
            Ordering::Equal => ties += 1,
            Ordering::Less => {}
        }
        run = d;
        run_count = 1;
    }

    (ties == 1).then_some(best)
}

/// Lower median of the positive adjacent deltas, rounded up to whole seconds.
#[must_use]
pub fn lower_median_step_seconds(instants: &[DateTime<Utc>]) -> Option<i64> {
    lower_median(&positive_deltas(instants)).map(ceil_secs)
}

fn lower_median(sorted: &[i64]) -> Option<i64> {
    if sorted.is_empty() {
        return None;
    }
    Some(sorted[(sorted.len() - 1) / 2])
}

/// Sorted positive adjacent deltas, in milliseconds.
fn positive_deltas(instants: &[DateTime<Utc>]) -> Vec<i64> {
    let mut ts = instants.to_vec();
    ts.sort_unstable();
    let mut deltas: Vec<i64> = ts
        .windows(2)
        .map(|w| (w[1] - w[0]).num_milliseconds())
        .filter(|&d| d > 0)
        .collect();
    deltas.sort_unstable();
    deltas
}

/// Whole seconds covering `ms`, at least one.
pub(crate) fn ceil_secs(ms: i64) -> i64 {
    (ms.max(0) + 999).div_euclid(1000).max(1)
}

/// Nearest common cadence to `secs` on a log scale; steps beyond a day are kept.
fn snap_to_cadence(secs: i64) -> i64 {
    if secs > CADENCES[CADENCES.len() - 1] {
        return secs;
    }
    #[allow(clippy::cast_precision_loss)]
    let distance = |c: i64| (secs as f64 / c as f64).ln().abs();
    CADENCES
        .iter()
        .copied()
        .min_by(|a, b| distance(*a).total_cmp(&distance(*b)))
        .unwrap_or(secs)
}

/// Heuristic: whether a series samples faster than daily.
///
/// True only if at least 3 adjacent deltas are shorter than a day and they
/// make up at least 60% of all positive deltas.
#[must_use]
pub fn is_subdaily(series: &Series) -> bool {
    let deltas = positive_deltas(&series.instants());
    let subdaily = deltas.iter().filter(|&&d| d < DAY_MS).count();
    // subdaily / total >= 3/5
    subdaily >= 3 && subdaily * 5 >= deltas.len() * 3
}

/// Why a region was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum GapKind {
    /// Consecutive points further apart than the tolerated interval.
    MissingData,
    /// Slots whose coverage is under the configured threshold.
    LowCoverage,
    /// Consecutive slots that do not touch.
    Discontinuity,
}

/// A contiguous region of missing or under-covered data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Exclusive end.
    pub end: DateTime<Utc>,
    /// Items the nominal interval predicts in `[start, end)`.
    pub expected_items: usize,
    /// Items actually present in `[start, end)`.
    pub actual_items: usize,
    /// Classification.
    pub kind: GapKind,
}

impl Gap {
    /// Physical length of the region.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

/// Inferred nominal unit and the ordered, non-overlapping gaps of a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapReport {
    /// Declared or inferred sampling unit.
    pub nominal: TimeUnit,
    /// Flagged regions in time order.
    pub gaps: Vec<Gap>,
}

impl GapReport {
    /// Whether `[from, to)` touches no gap.
    #[must_use]
    pub fn is_backed(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        !self.gaps.iter().any(|g| g.start < to && from < g.end)
    }

    /// Total length of all gaps.
    #[must_use]
    pub fn missing_duration(&self) -> TimeDelta {
        self.gaps
            .iter()
            .fold(TimeDelta::zero(), |acc, g| acc + g.duration())
    }

    /// Share of `span` lost to gaps, clamped to `[0, 1]`.
    #[must_use]
    pub fn gap_ratio(&self, span: TimeDelta) -> f64 {
        let total = span.num_milliseconds();
        if total <= 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.missing_duration().num_milliseconds() as f64 / total as f64;
        ratio.clamp(0.0, 1.0)
    }
}

/// Infers the nominal interval of a series and flags gapped regions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GapDetector {
    config: GapConfig,
}

impl GapDetector {
    /// Detector with the given configuration.
    #[must_use]
    pub const fn new(config: GapConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &GapConfig {
        &self.config
    }

    /// Nominal unit of `series`: the declared unit, else the inferred one.
    ///
    /// The inferred unit is the mode of the positive deltas (slot widths for
    /// slot series). Without a unique mode the lower median is snapped to the
    /// nearest common cadence, so jittered samples around one minute infer
    /// `1m` rather than an odd observed delta. Sub-second cadences round up
    /// to `1s`.
    ///
    /// # Errors
    /// Returns `InsufficientData` with fewer than two items, or `InvalidArg`
    /// when no positive delta exists.
    pub fn nominal(&self, series: &Series) -> Result<TimeUnit, TimeslotError> {
        if let Some(unit) = series.unit() {
            return Ok(unit);
        }
        if series.len() < 2 {
            return Err(TimeslotError::insufficient(2, series.len()));
        }
        let deltas = match series.slots() {
            // Slot widths are the sampling cadence; starts may jump over holes.
            Some(slots) => {
                let mut widths: Vec<i64> = slots
                    .iter()
                    .map(|s| s.duration().num_milliseconds())
                    .filter(|&d| d > 0)
                    .collect();
                widths.sort_unstable();
                widths
            }
            None => positive_deltas(&series.instants()),
        };
        let secs = match self.config.estimator {
            IntervalEstimator::LowerMedian => lower_median(&deltas).map(ceil_secs),
            _ => unique_mode(&deltas)
                .map(ceil_secs)
                .or_else(|| lower_median(&deltas).map(|ms| snap_to_cadence(ceil_secs(ms)))),
        };
        let secs = secs.ok_or_else(|| TimeslotError::InvalidArg("no positive interval between items".into()))?;
        TimeUnit::from_seconds(secs)
    }

    /// Whether consecutive items `delta` apart leave a gap when `expected`
    /// separates them nominally.
    #[must_use]
    pub fn is_gap(&self, delta: TimeDelta, expected: TimeDelta) -> bool {
        exceeds(delta, expected, self.config.tolerance)
    }

    /// Flag the gaps of `series`.
    ///
    /// # Errors
    /// Returns `InvalidArg` for an out-of-range configuration,
    /// `InsufficientData` with fewer than two items.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "timeslot::gaps::detect",
            skip(self, series),
            fields(kind = %series.kind(), len = series.len(), tolerance = self.config.tolerance),
        )
    )]
    pub fn detect(&self, series: &Series) -> Result<GapReport, TimeslotError> {
        self.config.validate()?;
        if series.len() < 2 {
            return Err(TimeslotError::insufficient(2, series.len()));
        }
        let nominal = self.nominal(series)?;
        let gaps = match series.kind() {
            SeriesKind::Points => self.point_gaps(series, nominal)?,
            SeriesKind::Slots => self.slot_gaps(series, nominal)?,
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(nominal = %nominal, gaps = gaps.len(), "gap detection complete");
        Ok(GapReport { nominal, gaps })
    }

    fn point_gaps(&self, series: &Series, nominal: TimeUnit) -> Result<Vec<Gap>, TimeslotError> {
        let ts = series.instants();
        let tz = series.tz();
        let mut gaps: Vec<Gap> = Vec::new();
        // Index range [first, last] of points bounding the current run of flagged deltas.
        let mut run: Option<(usize, usize)> = None;
        for i in 0..ts.len() - 1 {
            let expected = nominal.physical_duration(ts[i], tz)?;
            let flagged = self.is_gap(ts[i + 1] - ts[i], expected);
            run = match (run, flagged) {
                (Some((first, _)), true) => Some((first, i + 1)),
                (None, true) => Some((i, i + 1)),
                (Some((first, last)), false) => {
                    gaps.push(self.points_gap(&ts, first, last, nominal, series)?);
                    None
                }
                (None, false) => None,
            };
        }
        if let Some((first, last)) = run {
            gaps.push(self.points_gap(&ts, first, last, nominal, series)?);
        }
        Ok(gaps)
    }

    fn points_gap(
        &self,
        ts: &[DateTime<Utc>],
        first: usize,
        last: usize,
        nominal: TimeUnit,
        series: &Series,
    ) -> Result<Gap, TimeslotError> {
        let (start, end) = (ts[first], ts[last]);
        let step = nominal.physical_duration(start, series.tz())?;
        Ok(Gap {
            start,
            end,
            expected_items: expected_items(end - start, step),
            actual_items: last - first,
            kind: GapKind::MissingData,
        })
    }

    fn slot_gaps(&self, series: &Series, nominal: TimeUnit) -> Result<Vec<Gap>, TimeslotError> {
        let Some(slots) = series.slots() else {
            return Ok(Vec::new());
        };
        let threshold = self.config.min_slot_coverage;
        let mut gaps: Vec<Gap> = Vec::new();
        for (i, slot) in slots.iter().enumerate() {
            if i > 0 && slots[i - 1].end != slot.start {
                let (start, end) = (slots[i - 1].end, slot.start);
                let step = nominal.physical_duration(start, series.tz())?;
                gaps.push(Gap {
                    start,
                    end,
                    expected_items: expected_items(end - start, step),
                    actual_items: 0,
                    kind: GapKind::Discontinuity,
                });
            }
            if slot.coverage < threshold {
                match gaps.last_mut() {
                    Some(g) if g.kind == GapKind::LowCoverage && g.end == slot.start => {
                        g.end = slot.end;
                        g.expected_items += 1;
                        g.actual_items += 1;
                    }
                    _ => gaps.push(Gap {
                        start: slot.start,
                        end: slot.end,
                        expected_items: 1,
                        actual_items: 1,
                        kind: GapKind::LowCoverage,
                    }),
                }
            }
        }
        Ok(gaps)
    }
}

fn exceeds(delta: TimeDelta, expected: TimeDelta, tolerance: f64) -> bool {
    #[allow(clippy::cast_precision_loss)]
    let limit = expected.num_milliseconds() as f64 * tolerance;
    #[allow(clippy::cast_precision_loss)]
    let got = delta.num_milliseconds() as f64;
    got > limit
}

fn expected_items(span: TimeDelta, step: TimeDelta) -> usize {
    let step = step.num_milliseconds();
    if step <= 0 {
        return 0;
    }
    usize::try_from(span.num_milliseconds() / step).unwrap_or(0)
}

/// Detect gaps with default settings, optionally overriding the tolerance.
///
/// ```
/// use chrono::DateTime;
/// use timeslot_core::{Point, Schema, Series, detect_gaps};
///
/// let t = |s| DateTime::from_timestamp(s, 0).unwrap();
/// // 60s cadence with the sample at 180s missing.
/// let points = [0, 60, 120, 240, 300]
///     .into_iter()
///     .map(|s| Point::single(t(s), 1.0))
///     .collect();
/// let series = Series::from_points(Schema::single("v").unwrap(), points, chrono_tz::UTC).unwrap();
/// let report = detect_gaps(&series, Some(1.5)).unwrap();
/// assert_eq!(report.nominal.to_string(), "1m");
/// assert_eq!(report.gaps.len(), 1);
/// assert_eq!((report.gaps[0].start, report.gaps[0].end), (t(120), t(240)));
/// ```
///
/// # Errors
/// See [`GapDetector::detect`].
pub fn detect_gaps(series: &Series, tolerance: Option<f64>) -> Result<GapReport, TimeslotError> {
    let mut config = GapConfig::default();
    if let Some(tolerance) = tolerance {
        config = config.with_tolerance(tolerance);
    }
    GapDetector::new(config).detect(series)
}
