use chrono::{DateTime, TimeDelta, Utc};
use proptest::prelude::*;
use timeslot_core::{
    GapAnnotator, GapKind, Operation, Point, Schema, Series, Slot, TimeslotError, detect_gaps,
};

fn t(s: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(s, 0).unwrap()
}

fn points(ts: &[i64]) -> Series {
    let points = ts.iter().map(|&s| Point::single(t(s), 1.0)).collect();
    Series::from_points(Schema::single("v").unwrap(), points, chrono_tz::UTC).unwrap()
}

proptest! {
    #[test]
    fn one_missing_sample_yields_exactly_one_gap(n in 5usize..60, k_seed in 0usize..1000, base in -1_000_000i64..1_000_000) {
        // Drop the sample at position k (never the first or last).
        let k = 1 + k_seed % (n - 2);
        let ts: Vec<i64> = (0..n as i64)
            .filter(|&i| i as usize != k)
            .map(|i| base + i * 60)
            .collect();
        let report = detect_gaps(&points(&ts), Some(1.5)).unwrap();
        prop_assert_eq!(report.nominal.to_string(), "1m");
        prop_assert_eq!(report.gaps.len(), 1);
        let gap = &report.gaps[0];
        prop_assert_eq!(gap.start, t(base + (k as i64 - 1) * 60));
        prop_assert_eq!(gap.end, t(base + (k as i64 + 1) * 60));
        prop_assert_eq!(gap.expected_items, 2);
        prop_assert_eq!(gap.actual_items, 1);
        prop_assert_eq!(gap.kind, GapKind::MissingData);
    }
}

#[test]
fn adjacent_flagged_deltas_merge() {
    let report = detect_gaps(&points(&[0, 60, 120, 240, 360, 420, 480]), None).unwrap();
    assert_eq!(report.gaps.len(), 1);
    let gap = &report.gaps[0];
    assert_eq!((gap.start, gap.end), (t(120), t(360)));
    assert_eq!((gap.expected_items, gap.actual_items), (4, 2));
    assert_eq!(report.missing_duration(), TimeDelta::seconds(240));
    assert!(!report.is_backed(t(240), t(360)));
    assert!(report.is_backed(t(60), t(120)));
}

#[test]
fn delta_within_tolerance_is_not_a_gap() {
    // 89s stays under 60s * 1.5.
    let report = detect_gaps(&points(&[0, 60, 120, 209, 269, 329]), Some(1.5)).unwrap();
    assert!(report.gaps.is_empty());
}

#[test]
fn tolerance_below_one_is_rejected() {
    let err = detect_gaps(&points(&[0, 60, 120]), Some(0.9)).unwrap_err();
    assert!(matches!(err, TimeslotError::InvalidArg(_)));
}

#[test]
fn fewer_than_two_items_is_insufficient() {
    let err = detect_gaps(&points(&[0]), None).unwrap_err();
    assert_eq!(err, TimeslotError::InsufficientData { required: 2, got: 1 });
}

#[test]
fn slot_gaps_flag_low_coverage_and_holes() {
    let h = |i: i64| t(i * 3600);
    let slot = |i: i64, coverage: f64| Slot::new(h(i), h(i + 1), vec![Some(1.0)]).with_coverage(coverage);
    let slots = vec![
        slot(0, 1.0),
        slot(1, 0.2),
        slot(2, 0.1),
        slot(3, 0.9),
        // Hours 4 and 5 are absent.
        slot(6, 1.0),
    ];
    let series = Series::from_slots(
        Schema::single("v").unwrap(),
        slots,
        chrono_tz::UTC,
        Some("1h".parse().unwrap()),
    )
    .unwrap();
    let report = detect_gaps(&series, None).unwrap();
    assert_eq!(report.gaps.len(), 2);
    assert_eq!(report.gaps[0].kind, GapKind::LowCoverage);
    assert_eq!((report.gaps[0].start, report.gaps[0].end), (h(1), h(3)));
    assert_eq!(report.gaps[0].expected_items, 2);
    assert_eq!(report.gaps[1].kind, GapKind::Discontinuity);
    assert_eq!((report.gaps[1].start, report.gaps[1].end), (h(4), h(6)));
    assert_eq!(report.gaps[1].expected_items, 2);
    assert_eq!(report.gaps[1].actual_items, 0);
}

#[test]
fn gap_annotator_attaches_report() {
    let series = points(&[0, 60, 180, 240]);
    let annotated = GapAnnotator::default().apply(&series).unwrap();
    let report = annotated.gaps().unwrap();
    assert_eq!(report.gaps.len(), 1);
    assert!((report.gap_ratio(TimeDelta::seconds(240)) - 0.5).abs() < 1e-12);
    assert_eq!(annotated.len(), series.len());
    assert_eq!(GapAnnotator::default().config_json()["tolerance"], 1.5);
}
