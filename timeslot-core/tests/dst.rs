use chrono::{DateTime, Datelike, TimeDelta, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use proptest::prelude::*;
use timeslot_core::{
    AggregationPolicy, CoveragePolicy, Point, Schema, Series, Slot, TimeUnit, resample, reslot,
};

const ROME: Tz = chrono_tz::Europe::Rome;
/// Spring-forward at local midnight: 2018-11-04 00:00 does not exist.
const SAO_PAULO: Tz = chrono_tz::America::Sao_Paulo;

fn unit(s: &str) -> TimeUnit {
    s.parse().unwrap()
}

fn local_midnight(tz: Tz, y: i32, m: u32, d: u32) -> DateTime<Utc> {
    tz.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap().to_utc()
}

/// Hourly, fully covered slots of value 1 over `[from, to)`.
fn hourly(from: DateTime<Utc>, to: DateTime<Utc>, tz: Tz) -> Series {
    let mut slots = Vec::new();
    let mut cur = from;
    while cur < to {
        let next = cur + TimeDelta::hours(1);
        slots.push(Slot::new(cur, next, vec![Some(1.0)]));
        cur = next;
    }
    Series::from_slots(Schema::single("v").unwrap(), slots, tz, Some(unit("1h"))).unwrap()
}

#[test]
fn day_unit_spans_23_and_25_hours_on_transition_days() {
    let day = unit("1D");
    let spring = local_midnight(ROME, 2022, 3, 27);
    let fall = local_midnight(ROME, 2022, 10, 30);
    let plain = local_midnight(ROME, 2022, 6, 15);
    assert_eq!(day.physical_duration(spring, ROME).unwrap(), TimeDelta::hours(23));
    assert_eq!(day.physical_duration(fall, ROME).unwrap(), TimeDelta::hours(25));
    assert_eq!(day.physical_duration(plain, ROME).unwrap(), TimeDelta::hours(24));
}

#[test]
fn month_unit_follows_calendar_length() {
    let month = unit("1M");
    let feb = local_midnight(chrono_tz::UTC, 2024, 2, 1);
    assert_eq!(month.physical_duration(feb, chrono_tz::UTC).unwrap(), TimeDelta::days(29));
    // March in Rome loses the DST hour.
    let march = local_midnight(ROME, 2022, 3, 1);
    assert_eq!(
        month.physical_duration(march, ROME).unwrap(),
        TimeDelta::days(31) - TimeDelta::hours(1)
    );
}

#[test]
fn calendar_units_compare_only_at_an_anchor() {
    let (day, hours) = (unit("1D"), unit("24h"));
    assert_eq!(day.partial_cmp_fixed(&hours), None);
    let spring = local_midnight(ROME, 2022, 3, 27);
    assert!(day.cmp_at(&hours, spring, ROME).unwrap().is_lt());
    let fall = local_midnight(ROME, 2022, 10, 30);
    assert!(day.cmp_at(&hours, fall, ROME).unwrap().is_gt());
}

#[test]
fn hourly_floor_aligns_to_local_wall_clock() {
    let kolkata: Tz = chrono_tz::Asia::Kolkata;
    let at = kolkata.with_ymd_and_hms(2024, 5, 2, 10, 45, 0).unwrap().to_utc();
    let floored = unit("1h").floor(at, kolkata).unwrap();
    assert_eq!(floored, kolkata.with_ymd_and_hms(2024, 5, 2, 10, 0, 0).unwrap().to_utc());
}

#[test]
fn boundaries_land_on_local_midnights_across_spring_forward() {
    let got: Vec<_> = unit("1D")
        .boundaries(local_midnight(ROME, 2022, 3, 26) + TimeDelta::hours(5), ROME)
        .unwrap()
        .take(4)
        .collect();
    let want: Vec<_> = (26..=29).map(|d| local_midnight(ROME, 2022, 3, d)).collect();
    assert_eq!(got, want);
}

fn day_counts(tz: Tz, from: (i32, u32, u32), to: (i32, u32, u32)) -> Vec<(f64, i64)> {
    let start = local_midnight(tz, from.0, from.1, from.2);
    let end = local_midnight(tz, to.0, to.1, to.2);
    let out = reslot(
        &hourly(start, end, tz),
        unit("1D"),
        &AggregationPolicy::new("count"),
        &CoveragePolicy::default(),
    )
    .unwrap();
    out.slots()
        .unwrap()
        .iter()
        .map(|s| {
            assert_eq!(s.coverage, 1.0);
            assert!(s.valid);
            (s.value(0).unwrap(), s.duration().num_hours())
        })
        .collect()
}

#[test]
fn hourly_to_daily_reslot_on_spring_forward() {
    assert_eq!(
        day_counts(ROME, (2022, 3, 26), (2022, 3, 29)),
        vec![(24.0, 24), (23.0, 23), (24.0, 24)]
    );
}

#[test]
fn hourly_to_daily_reslot_on_fall_back() {
    assert_eq!(
        day_counts(ROME, (2022, 10, 29), (2022, 11, 1)),
        vec![(24.0, 24), (25.0, 25), (24.0, 24)]
    );
}

#[test]
fn hourly_to_daily_reslot_when_local_midnight_is_skipped() {
    assert_eq!(
        day_counts(SAO_PAULO, (2018, 11, 3), (2018, 11, 6)),
        vec![(24.0, 24), (23.0, 23), (24.0, 24)]
    );
}

#[test]
fn points_resample_into_days_starting_at_the_first_valid_local_instant() {
    let start = local_midnight(SAO_PAULO, 2018, 11, 3);
    let points = (0..71)
        .map(|h| Point::single(start + TimeDelta::hours(h), 1.0))
        .collect();
    let series = Series::from_points(Schema::single("v").unwrap(), points, SAO_PAULO).unwrap();
    let out = resample(&series, unit("1D"), &AggregationPolicy::new("count"), &CoveragePolicy::default()).unwrap();
    let slots = out.slots().unwrap();

    let days: Vec<(f64, i64)> = slots
        .iter()
        .map(|s| (s.value(0).unwrap(), s.duration().num_hours()))
        .collect();
    assert_eq!(days, vec![(24.0, 24), (23.0, 23), (24.0, 24)]);
    // The missing midnight moves the boundary to 01:00 local.
    let second = slots[1].start.with_timezone(&SAO_PAULO);
    assert_eq!((second.day(), second.hour()), (4, 1));
    assert_eq!(slots[2].start, local_midnight(SAO_PAULO, 2018, 11, 5));
}

#[test]
fn daily_slots_reslot_into_calendar_months() {
    let utc = chrono_tz::UTC;
    let start = local_midnight(utc, 2024, 1, 1);
    let slots: Vec<Slot> = (0..91)
        .map(|d| {
            let s = start + TimeDelta::days(d);
            Slot::new(s, s + TimeDelta::days(1), vec![Some(2.0)])
        })
        .collect();
    let daily = Series::from_slots(Schema::single("v").unwrap(), slots, utc, Some(unit("1D"))).unwrap();
    let monthly = reslot(
        &daily,
        unit("1M"),
        &AggregationPolicy::new("sum"),
        &CoveragePolicy::default(),
    )
    .unwrap();
    let sums: Vec<f64> = monthly.slots().unwrap().iter().filter_map(|s| s.value(0)).collect();
    assert_eq!(sums, vec![62.0, 58.0, 62.0]);
}

proptest! {
    #[test]
    fn every_day_of_2022_in_rome_is_24h_except_transitions(ordinal in 1u32..=365) {
        let date = chrono::NaiveDate::from_yo_opt(2022, ordinal).unwrap();
        let midnight = ROME
            .from_local_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
            .single()
            .unwrap()
            .to_utc();
        let hours = unit("1D").physical_duration(midnight, ROME).unwrap().num_hours();
        let expected = match (date.month0() + 1, date.day0() + 1) {
            (3, 27) => 23,
            (10, 30) => 25,
            _ => 24,
        };
        prop_assert_eq!(hours, expected);
    }
}
