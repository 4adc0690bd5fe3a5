//! Resampling points and re-slotting slots onto uniform, timezone-aligned
//! slot boundaries.
//!
//! Destination slots are built in three passes: boundaries are materialized
//! from `floor(first instant)` by repeated `slot_end`, each window is reduced
//! independently (in parallel with the `parallel` feature), then the fill
//! policy runs over the under-covered slots.
//!
//! An interval between consecutive points backs a destination slot unless it
//! is a gap against the step expected inside that slot: the declared unit
//! capped at the slot width, else the slot width itself. The threshold never
//! depends on which points are present, so dropping a point cannot raise the
//! coverage of any slot.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::gaps::{GapDetector, ceil_secs};
use crate::operation::Operation;
use crate::reduce::{Contribution, Reducer, ReducerRegistry};
use crate::series::{Point, Series, Slot};
use crate::unit::TimeUnit;
use crate::{AggregationPolicy, CoveragePolicy, FillPolicy, GapConfig, SeriesKind, TimeslotError};

/// A destination slot `[start, end)` and the sampling step expected inside it.
#[derive(Debug, Clone, Copy)]
struct Window {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    step: TimeDelta,
}

/// Resampling configuration bundled with its target unit.
///
/// ```
/// use chrono::DateTime;
/// use timeslot_core::{CoveragePolicy, Point, Resampler, Schema, Series};
///
/// let t = |s| DateTime::from_timestamp(s, 0).unwrap();
/// let points = (0..6).map(|i| Point::single(t(i * 30), i as f64)).collect();
/// let series = Series::from_points(Schema::single("v").unwrap(), points, chrono_tz::UTC).unwrap();
///
/// let out = Resampler::new("1m".parse().unwrap())
///     .coverage(CoveragePolicy::with_min_coverage(0.5))
///     .run(&series)
///     .unwrap();
/// let slots = out.slots().unwrap();
/// assert_eq!(slots.len(), 3);
/// assert_eq!(slots[0].end, slots[1].start);
/// ```
#[derive(Debug, Clone)]
pub struct Resampler {
    target: TimeUnit,
    aggregation: AggregationPolicy,
    coverage: CoveragePolicy,
    gap: GapConfig,
    registry: ReducerRegistry,
}

impl Resampler {
    /// Resampler to `target` with default policies and built-in reducers.
    #[must_use]
    pub fn new(target: TimeUnit) -> Self {
        Self {
            target,
            aggregation: AggregationPolicy::default(),
            coverage: CoveragePolicy::default(),
            gap: GapConfig::default(),
            registry: ReducerRegistry::default(),
        }
    }

    /// Replace the aggregation policy.
    #[must_use]
    pub fn aggregation(mut self, aggregation: AggregationPolicy) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Replace the coverage policy.
    #[must_use]
    pub const fn coverage(mut self, coverage: CoveragePolicy) -> Self {
        self.coverage = coverage;
        self
    }

    /// Replace the gap configuration used to decide which point intervals
    /// are backed by data.
    #[must_use]
    pub const fn gap_config(mut self, gap: GapConfig) -> Self {
        self.gap = gap;
        self
    }

    /// Replace the reducer registry.
    #[must_use]
    pub fn registry(mut self, registry: ReducerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Destination unit.
    #[must_use]
    pub const fn target(&self) -> TimeUnit {
        self.target
    }

    /// Resample `series` into a slots-kind series of `target` slots.
    ///
    /// # Errors
    /// - `InvalidArg` for out-of-range policies.
    /// - `UnknownAggregation` if the policy names an unregistered reducer.
    /// - `UpsamplingNotSupported` if `target` is finer than the nominal unit
    ///   of `series` at its first instant.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "timeslot::resample::run",
            skip(self, series),
            fields(
                target = %self.target,
                kind = %series.kind(),
                len = series.len(),
                tz = %series.tz(),
            ),
        )
    )]
    pub fn run(&self, series: &Series) -> Result<Series, TimeslotError> {
        self.coverage.validate()?;
        self.gap.validate()?;
        let reducers = self.registry.resolve(&self.aggregation, series.schema())?;
        let tz = series.tz();

        let Some(first) = series.first_instant() else {
            return self.finish(series, Vec::new());
        };
        let detector = GapDetector::new(self.gap);
        let nominal = match (series.unit(), series.slots()) {
            (Some(unit), _) => Some(unit),
            (None, _) if series.len() >= 2 => Some(detector.nominal(series)?),
            (None, Some(slots)) => Some(TimeUnit::from_seconds(ceil_secs(
                slots[0].duration().num_milliseconds(),
            ))?),
            (None, None) => None,
        };
        if let Some(nominal) = nominal {
            let want = self.target.physical_duration(first, tz)?;
            let have = nominal.physical_duration(first, tz)?;
            if want < have {
                return Err(TimeslotError::upsampling(self.target, nominal));
            }
            if series.kind() == SeriesKind::Slots && series.unit() == Some(self.target) {
                return self.revalidate(series);
            }
        }

        let windows = self.windows(series, first)?;
        let source = match series.points() {
            Some(points) => Source::Points { points, detector },
            None => Source::Slots(series.slots().unwrap_or_default()),
        };

        let build = |w: &Window| self.build_slot(&source, &reducers, *w);
        #[cfg(feature = "parallel")]
        let slots: Vec<Slot> = windows.par_iter().map(build).collect();
        #[cfg(not(feature = "parallel"))]
        let slots: Vec<Slot> = windows.iter().map(build).collect();

        self.finish(series, slots)
    }

    /// Boundary pairs from `floor(first)`: while the slot start precedes the
    /// last point instant (or the last source slot end); at least one.
    fn windows(&self, series: &Series, first: DateTime<Utc>) -> Result<Vec<Window>, TimeslotError> {
        let tz = series.tz();
        let (last, declared) = match series.slots() {
            Some(slots) => (slots.last().map_or(first, |s| s.end), None),
            None => (series.last_instant().unwrap_or(first), series.unit()),
        };
        let mut bounds = self.target.boundaries(first, tz)?;
        let mut windows: Vec<Window> = Vec::new();
        let Some(mut start) = bounds.next() else {
            return Ok(windows);
        };
        while windows.is_empty() || start < last {
            let Some(end) = bounds.next() else { break };
            let step = match declared {
                Some(unit) => unit.physical_duration(start, tz)?.min(end - start),
                None => end - start,
            };
            windows.push(Window { start, end, step });
            start = end;
        }
        Ok(windows)
    }

    fn build_slot(
        &self,
        source: &Source<'_>,
        reducers: &[Arc<dyn Reducer>],
        window: Window,
    ) -> Slot {
        let Window { start, end, .. } = window;
        let (contributions, backed) = match source {
            Source::Points { points, detector } => {
                self.gather_points(points, detector, window, reducers.len())
            }
            Source::Slots(slots) => gather_slots(slots, start, end, reducers.len()),
        };
        let values = reducers
            .iter()
            .zip(&contributions)
            .map(|(r, c)| r.reduce(c))
            .collect();
        let coverage = (backed / secs(end - start)).clamp(0.0, 1.0);
        Slot::new(start, end, values)
            .with_coverage(coverage)
            .with_validity(coverage >= self.coverage.min_coverage)
    }

    /// Per-value contributions and backed seconds inside `[start, end)`.
    fn gather_points(
        &self,
        points: &[Point],
        detector: &GapDetector,
        Window { start, end, step }: Window,
        width: usize,
    ) -> (Vec<Vec<Contribution>>, f64) {
        let backed = |i: usize| {
            points
                .get(i + 1)
                .is_some_and(|next| !detector.is_gap(next.ts - points[i].ts, step))
        };
        let mut out: Vec<Vec<Contribution>> = vec![Vec::new(); width];
        // First point at or after `start`, and the interval that may straddle `start`.
        let lo = points.partition_point(|p| p.ts < start);
        let hi = points.partition_point(|p| p.ts < end);

        let mut covered = 0.0;
        for i in lo.saturating_sub(1)..hi {
            if backed(i) {
                let a = points[i].ts.max(start);
                let b = points[i + 1].ts.min(end);
                if b > a {
                    covered += secs(b - a);
                }
            }
        }

        let interpolate = self.coverage.interpolate_boundaries;
        let exact_start = points.get(lo).is_some_and(|p| p.ts == start);
        for (j, column) in out.iter_mut().enumerate() {
            if interpolate
                && !exact_start
                && let Some(v) = value_at(points, &backed, lo, start, j)
            {
                column.push(virtual_at(start, v));
            }
            column.extend(points[lo..hi].iter().filter_map(|p| {
                Some(Contribution {
                    at: p.ts,
                    value: p.value(j)?,
                    weight: 1.0,
                    share: 1.0,
                    is_virtual: false,
                })
            }));
            if interpolate && let Some(v) = value_at(points, &backed, hi, end, j) {
                column.push(virtual_at(end, v));
            }
        }
        (out, covered)
    }

    /// Equal-unit re-slot: same slots, validity and fill recomputed.
    fn revalidate(&self, series: &Series) -> Result<Series, TimeslotError> {
        let slots = series
            .slots()
            .unwrap_or_default()
            .iter()
            .map(|s| {
                let mut s = s.clone();
                s.valid = s.coverage >= self.coverage.min_coverage;
                s
            })
            .collect();
        self.finish(series, slots)
    }

    fn finish(&self, series: &Series, mut slots: Vec<Slot>) -> Result<Series, TimeslotError> {
        apply_fill(&mut slots, self.coverage.fill);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            slots = slots.len(),
            invalid = slots.iter().filter(|s| !s.valid).count(),
            "resample complete"
        );
        let out = Series::from_slots(series.schema().clone(), slots, series.tz(), Some(self.target))?;
        Ok(match series.title() {
            Some(title) => out.with_title(title),
            None => out,
        })
    }
}

impl Operation for Resampler {
    fn name(&self) -> &'static str {
        "Resampler"
    }

    fn apply(&self, series: &Series) -> Result<Series, TimeslotError> {
        self.run(series)
    }

    fn config_json(&self) -> serde_json::Value {
        serde_json::json!({
            "target": self.target.to_string(),
            "aggregation": serde_json::to_value(&self.aggregation).unwrap_or_default(),
            "coverage": serde_json::to_value(self.coverage).unwrap_or_default(),
            "gap": serde_json::to_value(self.gap).unwrap_or_default(),
            "reducers": self.registry.names(),
        })
    }
}

enum Source<'a> {
    Points { points: &'a [Point], detector: GapDetector },
    Slots(&'a [Slot]),
}

/// Duration-weighted contributions and coverage-weighted overlap seconds.
fn gather_slots(
    slots: &[Slot],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    width: usize,
) -> (Vec<Vec<Contribution>>, f64) {
    let mut out: Vec<Vec<Contribution>> = vec![Vec::new(); width];
    let mut covered = 0.0;
    let lo = slots.partition_point(|s| s.end <= start);
    for s in slots[lo..].iter().take_while(|s| s.start < end) {
        let overlap = secs(s.overlap(start, end));
        if overlap <= 0.0 {
            continue;
        }
        covered += overlap * s.coverage;
        let share = overlap / secs(s.duration());
        for (j, column) in out.iter_mut().enumerate() {
            if let Some(value) = s.value(j) {
                column.push(Contribution {
                    at: s.start,
                    value,
                    weight: overlap,
                    share,
                    is_virtual: false,
                });
            }
        }
    }
    (out, covered)
}

/// Value of column `j` at `t`: the point sitting exactly at `t`, else a
/// linear interpolation across the backed interval bracketing `t`.
/// `next` is the index of the first point at or after `t`; `backed(i)` tells
/// whether the interval starting at point `i` carries data.
fn value_at(
    points: &[Point],
    backed: &impl Fn(usize) -> bool,
    next: usize,
    t: DateTime<Utc>,
    j: usize,
) -> Option<f64> {
    let right = points.get(next)?;
    if right.ts == t {
        return right.value(j);
    }
    let i = next.checked_sub(1)?;
    if !backed(i) {
        return None;
    }
    let left = &points[i];
    let (v0, v1) = (left.value(j)?, right.value(j)?);
    Some(lerp(v0, v1, secs(t - left.ts) / secs(right.ts - left.ts)))
}

const fn virtual_at(at: DateTime<Utc>, value: f64) -> Contribution {
    Contribution {
        at,
        value,
        weight: 1.0,
        share: 0.0,
        is_virtual: true,
    }
}

fn lerp(v0: f64, v1: f64, frac: f64) -> f64 {
    (v1 - v0).mul_add(frac, v0)
}

#[allow(clippy::cast_precision_loss)]
fn secs(d: TimeDelta) -> f64 {
    d.num_milliseconds() as f64 / 1000.0
}

fn midpoint(s: &Slot) -> f64 {
    secs(s.start - DateTime::UNIX_EPOCH) + secs(s.duration()) / 2.0
}

fn apply_fill(slots: &mut [Slot], fill: FillPolicy) {
    match fill {
        FillPolicy::Missing => {
            for s in slots.iter_mut().filter(|s| !s.valid) {
                s.values.iter_mut().for_each(|v| *v = None);
            }
        }
        FillPolicy::Interpolate => {
            let snapshot: Vec<Slot> = slots.to_vec();
            for (k, s) in slots.iter_mut().enumerate() {
                if s.valid {
                    continue;
                }
                let x = midpoint(s);
                for (j, v) in s.values.iter_mut().enumerate() {
                    let left = snapshot[..k].iter().rev().find(|n| n.valid && n.value(j).is_some());
                    let right = snapshot[k + 1..].iter().find(|n| n.valid && n.value(j).is_some());
                    *v = match (left, right) {
                        (Some(l), Some(r)) => {
                            let (x0, x1) = (midpoint(l), midpoint(r));
                            Some(lerp(
                                l.value(j).unwrap_or_default(),
                                r.value(j).unwrap_or_default(),
                                (x - x0) / (x1 - x0),
                            ))
                        }
                        _ => None,
                    };
                }
                s.reconstructed = s.values.iter().any(Option::is_some);
            }
        }
        _ => {}
    }
}

/// Resample a points- or slots-kind series to `target`.
///
/// ```
/// use chrono::DateTime;
/// use timeslot_core::{AggregationPolicy, CoveragePolicy, Point, Schema, Series, resample};
///
/// let t = |s| DateTime::from_timestamp(s, 0).unwrap();
/// let points = (0..10).map(|i| Point::single(t(i * 60), 1.0)).collect();
/// let series = Series::from_points(Schema::single("v").unwrap(), points, chrono_tz::UTC).unwrap();
///
/// // 30s is finer than the 60s sampling: refused rather than fabricated.
/// let err = resample(&series, "30s".parse().unwrap(), &AggregationPolicy::default(), &CoveragePolicy::default());
/// assert!(err.is_err());
/// ```
///
/// # Errors
/// See [`Resampler::run`].
pub fn resample(
    series: &Series,
    target: TimeUnit,
    aggregation: &AggregationPolicy,
    coverage: &CoveragePolicy,
) -> Result<Series, TimeslotError> {
    Resampler::new(target)
        .aggregation(aggregation.clone())
        .coverage(*coverage)
        .run(series)
}

/// Re-slot a slots-kind series into coarser `target` slots.
///
/// # Errors
/// `InvalidArg` for a points-kind series, otherwise see [`Resampler::run`].
pub fn reslot(
    series: &Series,
    target: TimeUnit,
    aggregation: &AggregationPolicy,
    coverage: &CoveragePolicy,
) -> Result<Series, TimeslotError> {
    if series.kind() != SeriesKind::Slots {
        return Err(TimeslotError::InvalidArg(format!(
            "reslot needs a slots series, got a {} series",
            series.kind()
        )));
    }
    resample(series, target, aggregation, coverage)
}
