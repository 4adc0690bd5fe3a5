use timeslot_types::{
    AggregationPolicy, CoveragePolicy, FillPolicy, GapConfig, IntervalEstimator, PipelineConfig,
    SeriesKind, SeriesKinds,
};

#[test]
fn gap_config_roundtrip() {
    let cfg = GapConfig {
        tolerance: 2.0,
        min_slot_coverage: 0.75,
        estimator: IntervalEstimator::LowerMedian,
    };

    let json = serde_json::to_string(&cfg).expect("serialize gap config");
    let de: GapConfig = serde_json::from_str(&json).expect("deserialize gap config");

    assert_eq!(de, cfg);
}

#[test]
fn coverage_policy_roundtrip() {
    let policy = CoveragePolicy::with_min_coverage(0.8)
        .fill(FillPolicy::Interpolate)
        .interpolate_boundaries(false);

    let json = serde_json::to_string(&policy).expect("serialize coverage policy");
    let de: CoveragePolicy = serde_json::from_str(&json).expect("deserialize coverage policy");

    assert!((de.min_coverage - 0.8).abs() < f64::EPSILON);
    assert!(matches!(de.fill, FillPolicy::Interpolate));
    assert!(!de.interpolate_boundaries);
}

#[test]
fn aggregation_policy_overrides_survive_roundtrip() {
    let policy = AggregationPolicy::new("mean")
        .with_value("energy", "sum")
        .with_value("peak", "max");

    let json = serde_json::to_string(&policy).expect("serialize aggregation policy");
    let de: AggregationPolicy = serde_json::from_str(&json).expect("deserialize aggregation");

    assert_eq!(de.reducer_for("energy"), "sum");
    assert_eq!(de.reducer_for("peak"), "max");
    assert_eq!(de.reducer_for("temperature"), "mean");
    assert_eq!(de.overrides().count(), 2);
}

#[test]
fn aggregation_policy_without_overrides_deserializes() {
    let de: AggregationPolicy =
        serde_json::from_str(r#"{"default":"last"}"#).expect("deserialize bare policy");
    assert_eq!(de.default_reducer(), "last");
    assert_eq!(de.reducer_for("anything"), "last");
}

#[test]
fn pipeline_config_defaults_roundtrip() {
    let cfg = PipelineConfig::default();
    let json = serde_json::to_string(&cfg).expect("serialize pipeline config");
    let de: PipelineConfig = serde_json::from_str(&json).expect("deserialize pipeline config");
    assert_eq!(de, cfg);
    assert!(de.validate_steps);
    assert!(de.normalize_for_models);
}

#[test]
fn series_kinds_flags() {
    let both = SeriesKinds::POINTS | SeriesKinds::SLOTS;
    assert!(both.accepts(SeriesKind::Points));
    assert!(both.accepts(SeriesKind::Slots));
    assert!(!SeriesKinds::SLOTS.accepts(SeriesKind::Points));
    assert_eq!(SeriesKinds::from(SeriesKind::Points), SeriesKinds::POINTS);
}
