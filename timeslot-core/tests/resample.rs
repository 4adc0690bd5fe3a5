use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use timeslot_core::{
    AggregationPolicy, Contribution, CoveragePolicy, FillPolicy, Operation, Point, Reducer,
    ReducerRegistry, Resampler, Schema, Series, SeriesKind, Slot, TimeUnit, TimeslotError,
    detect_gaps, resample, reslot,
};

fn t(s: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(s, 0).unwrap()
}

fn unit(s: &str) -> TimeUnit {
    s.parse().unwrap()
}

fn points(samples: &[(i64, f64)]) -> Series {
    let points = samples.iter().map(|&(s, v)| Point::single(t(s), v)).collect();
    Series::from_points(Schema::single("v").unwrap(), points, chrono_tz::UTC).unwrap()
}

fn coverage(min: f64) -> CoveragePolicy {
    CoveragePolicy::with_min_coverage(min)
}

#[test]
fn irregular_points_resample_into_one_minute_slots() {
    // No declared unit: deltas 16s, 45s and 69s infer a one-minute cadence.
    let series = points(&[(0, 10.0), (45, 12.0), (61, 11.0), (130, 9.0)]);
    let report = detect_gaps(&series, None).unwrap();
    assert_eq!(report.nominal.to_string(), "1m");
    assert!(report.gaps.is_empty());

    let out = resample(&series, unit("60s"), &AggregationPolicy::new("mean"), &coverage(0.5)).unwrap();

    assert_eq!(out.kind(), SeriesKind::Slots);
    assert_eq!(out.unit(), Some(unit("60s")));
    let slots = out.slots().unwrap();
    let bounds: Vec<_> = slots.iter().map(|s| (s.start, s.end)).collect();
    assert_eq!(bounds, vec![(t(0), t(60)), (t(60), t(120)), (t(120), t(180))]);

    assert_eq!(slots[0].coverage, 1.0);
    assert!(slots[0].valid);
    // 10 and 12 observed, 11.0625 interpolated at the 60s boundary.
    let mean = (10.0 + 12.0 + 11.0625) / 3.0;
    assert!((slots[0].value(0).unwrap() - mean).abs() < 1e-9);

    // Backed by 45→61 (1s inside) and 61→130 (59s inside).
    assert!((slots[1].coverage - 1.0).abs() < 1e-9);
    assert!(slots[1].valid);

    // Only 120→130 is backed.
    assert!((slots[2].coverage - 10.0 / 60.0).abs() < 1e-9);
    assert!(!slots[2].valid);
    assert!(slots[2].value(0).is_some(), "partial values are kept by default");
}

#[test]
fn dropping_a_point_does_not_raise_slot_coverage() {
    let full = points(&[(0, 1.0), (60, 1.0), (120, 1.0), (180, 1.0), (300, 1.0), (420, 1.0)]);
    let thinned = points(&[(0, 1.0), (120, 1.0), (180, 1.0), (300, 1.0), (420, 1.0)]);
    let cov = |s: &Series| {
        let out = resample(s, unit("4m"), &AggregationPolicy::default(), &CoveragePolicy::default()).unwrap();
        out.slots().unwrap().iter().map(|s| s.coverage).collect::<Vec<_>>()
    };
    let (before, after) = (cov(&full), cov(&thinned));
    assert_eq!(before.len(), after.len());
    assert!(before.iter().zip(&after).all(|(b, a)| a <= b), "{before:?} -> {after:?}");

    // With a declared minute cadence the two-minute holes count as missing.
    let declared = |s: Series| s.with_unit(unit("1m")).unwrap();
    let (before, after) = (cov(&declared(full)), cov(&declared(thinned)));
    assert!((before[0] - 0.75).abs() < 1e-9);
    assert!((after[0] - 0.25).abs() < 1e-9);
}

#[test]
fn sub_second_points_resample_to_seconds() {
    let samples = (0..20)
        .map(|i| Point::single(t(0) + TimeDelta::milliseconds(500 * i), 1.0))
        .collect();
    let series = Series::from_points(Schema::single("v").unwrap(), samples, chrono_tz::UTC).unwrap();
    assert_eq!(detect_gaps(&series, None).unwrap().nominal.to_string(), "1s");

    let out = resample(&series, unit("1s"), &AggregationPolicy::new("count"), &coverage(0.5)).unwrap();
    let slots = out.slots().unwrap();
    assert_eq!(slots.len(), 10);
    assert!(slots.iter().all(|s| s.value(0) == Some(2.0)));
    assert!(slots[..9].iter().all(|s| (s.coverage - 1.0).abs() < 1e-9));
    assert!((slots[9].coverage - 0.5).abs() < 1e-9);
}

#[test]
fn finer_target_than_point_sampling_is_refused() {
    let series = points(&[(0, 1.0), (60, 1.0), (120, 1.0), (180, 1.0)]);
    let err = resample(&series, unit("30s"), &AggregationPolicy::default(), &CoveragePolicy::default())
        .unwrap_err();
    assert_eq!(err, TimeslotError::upsampling("30s", "1m"));
}

#[test]
fn finer_target_than_slot_width_is_refused() {
    let slots = (0..4)
        .map(|h| Slot::new(t(h * 3600), t((h + 1) * 3600), vec![Some(1.0)]))
        .collect();
    let series = Series::from_slots(Schema::single("v").unwrap(), slots, chrono_tz::UTC, None).unwrap();
    let err = reslot(&series, unit("30m"), &AggregationPolicy::default(), &CoveragePolicy::default())
        .unwrap_err();
    assert!(matches!(err, TimeslotError::UpsamplingNotSupported { .. }));
}

#[test]
fn unknown_reducer_fails_the_whole_call() {
    let series = points(&[(0, 1.0), (60, 2.0)]);
    let err = resample(&series, unit("1m"), &AggregationPolicy::new("mode"), &CoveragePolicy::default())
        .unwrap_err();
    assert_eq!(err, TimeslotError::UnknownAggregation("mode".into()));
    assert!(err.is_structural());
}

#[test]
fn reslot_requires_slots() {
    let series = points(&[(0, 1.0), (60, 2.0)]);
    let err = reslot(&series, unit("5m"), &AggregationPolicy::default(), &CoveragePolicy::default())
        .unwrap_err();
    assert!(matches!(err, TimeslotError::InvalidArg(_)));
}

#[test]
fn empty_and_single_point_inputs() {
    let empty = Series::from_points(Schema::single("v").unwrap(), Vec::new(), chrono_tz::UTC).unwrap();
    let out = resample(&empty, unit("1h"), &AggregationPolicy::default(), &CoveragePolicy::default()).unwrap();
    assert!(out.is_empty());
    assert_eq!(out.kind(), SeriesKind::Slots);

    let single = points(&[(90, 4.0)]);
    let out = resample(&single, unit("1m"), &AggregationPolicy::default(), &CoveragePolicy::default()).unwrap();
    let slots = out.slots().unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!((slots[0].start, slots[0].end), (t(60), t(120)));
    assert_eq!(slots[0].value(0), Some(4.0));
    assert_eq!(slots[0].coverage, 0.0);
    assert!(!slots[0].valid);
}

/// Linear ramp sampled every minute with 240s, 300s and 360s missing.
fn ramp_with_hole() -> Series {
    let samples: Vec<(i64, f64)> = (0..=10)
        .map(|i| i * 60)
        .filter(|s| !(240..=360).contains(s))
        .map(|s| (s, s as f64))
        .collect();
    points(&samples).with_unit(unit("1m")).unwrap()
}

#[test]
fn interpolate_fill_reconstructs_hole_from_valid_neighbours() {
    let policy = coverage(0.5).fill(FillPolicy::Interpolate);
    let out = resample(&ramp_with_hole(), unit("2m"), &AggregationPolicy::default(), &policy).unwrap();
    let slots = out.slots().unwrap();
    assert_eq!(slots.len(), 5);
    let covs: Vec<f64> = slots.iter().map(|s| s.coverage).collect();
    assert_eq!(covs, vec![1.0, 0.5, 0.0, 0.5, 1.0]);

    let hole = &slots[2];
    assert!(!hole.valid);
    assert!(hole.reconstructed);
    // Neighbour means are 150 and 450 at midpoints 180s and 420s.
    assert!((hole.value(0).unwrap() - 300.0).abs() < 1e-9);
    assert!(slots.iter().enumerate().all(|(i, s)| s.reconstructed == (i == 2)));
}

#[test]
fn missing_fill_clears_values_and_keep_partial_keeps_them() {
    let strict = coverage(0.75);
    let kept = resample(&ramp_with_hole(), unit("2m"), &AggregationPolicy::default(), &strict).unwrap();
    let kept = kept.slots().unwrap();
    assert!(!kept[1].valid);
    assert_eq!(kept[1].value(0), Some(150.0));

    let cleared = resample(
        &ramp_with_hole(),
        unit("2m"),
        &AggregationPolicy::default(),
        &strict.fill(FillPolicy::Missing),
    )
    .unwrap();
    let cleared = cleared.slots().unwrap();
    assert_eq!(cleared[1].value(0), None);
    assert_eq!(cleared[0].value(0), kept[0].value(0));
}

#[test]
fn per_value_reducers_follow_the_policy() {
    let schema = Schema::new(["temp", "rain"]).unwrap();
    let pts = [(0, 20.0, 1.0), (60, 22.0, 2.0), (120, 24.0, 0.5), (180, 26.0, 0.0)]
        .into_iter()
        .map(|(s, temp, rain)| Point::new(t(s), vec![Some(temp), Some(rain)]))
        .collect();
    let series = Series::from_points(schema, pts, chrono_tz::UTC).unwrap();
    let policy = AggregationPolicy::new("max").with_value("rain", "sum");
    let out = resample(&series, unit("3m"), &policy, &CoveragePolicy::default().interpolate_boundaries(false))
        .unwrap();
    let slots = out.slots().unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].values, vec![Some(24.0), Some(3.5)]);
}

#[derive(Debug)]
struct Spread;

impl Reducer for Spread {
    fn name(&self) -> &str {
        "spread"
    }

    fn reduce(&self, contributions: &[Contribution]) -> Option<f64> {
        let real = contributions.iter().filter(|c| !c.is_virtual).map(|c| c.value);
        let (lo, hi) = real.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        (hi >= lo).then_some(hi - lo)
    }
}

#[test]
fn custom_reducer_and_operation_surface() {
    let mut registry = ReducerRegistry::default();
    registry.register(Arc::new(Spread));
    let resampler = Resampler::new(unit("5m"))
        .aggregation(AggregationPolicy::new("spread"))
        .registry(registry);

    let series = points(&[(0, 3.0), (60, 9.0), (120, 4.0), (180, 1.0), (240, 5.0)]).with_title("sensor");
    let out = resampler.apply(&series).unwrap();
    assert_eq!(out.title(), Some("sensor"));
    assert_eq!(out.slots().unwrap()[0].value(0), Some(8.0));

    let cfg = resampler.config_json();
    assert_eq!(cfg["target"], "5m");
    assert_eq!(cfg["aggregation"]["default"], "spread");
    assert_eq!(resampler.name(), "Resampler");
}

#[test]
fn reslot_to_own_unit_only_revalidates() {
    let slots = vec![
        Slot::new(t(0), t(60), vec![Some(1.0)]).with_coverage(0.4),
        Slot::new(t(60), t(120), vec![Some(2.0)]).with_coverage(0.9),
    ];
    let series =
        Series::from_slots(Schema::single("v").unwrap(), slots, chrono_tz::UTC, Some(unit("1m"))).unwrap();
    let out = reslot(&series, unit("1m"), &AggregationPolicy::default(), &coverage(0.5)).unwrap();
    let slots = out.slots().unwrap();
    assert!(!slots[0].valid);
    assert!(slots[1].valid);
    assert_eq!(slots[0].values, vec![Some(1.0)]);
    assert_eq!(slots[0].coverage, 0.4);
}

#[test]
fn slot_coverage_is_overlap_weighted() {
    let slots = vec![
        Slot::new(t(0), t(60), vec![Some(1.0)]).with_coverage(1.0),
        Slot::new(t(60), t(120), vec![Some(3.0)]).with_coverage(0.5),
        Slot::new(t(120), t(180), vec![None]).with_coverage(0.0),
    ];
    let series = Series::from_slots(Schema::single("v").unwrap(), slots, chrono_tz::UTC, None).unwrap();
    let out = reslot(&series, unit("3m"), &AggregationPolicy::default(), &coverage(0.5)).unwrap();
    let slot = &out.slots().unwrap()[0];
    assert!((slot.coverage - 0.5).abs() < 1e-9);
    assert!(slot.valid);
    assert_eq!(slot.value(0), Some(2.0));
}
