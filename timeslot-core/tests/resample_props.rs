use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use proptest::prelude::*;
use timeslot_core::{
    AggregationPolicy, CoveragePolicy, Point, Schema, Series, TimeUnit, TimeslotError, resample,
    reslot,
};

fn arb_tz() -> impl Strategy<Value = Tz> {
    prop::sample::select(vec![
        chrono_tz::UTC,
        chrono_tz::Europe::Rome,
        chrono_tz::Asia::Kolkata,
        chrono_tz::America::New_York,
    ])
}

fn arb_target() -> impl Strategy<Value = TimeUnit> {
    prop::sample::select(vec!["1m", "5m", "15m", "1h", "1D"]).prop_map(|s| s.parse().unwrap())
}

/// Strictly increasing points starting somewhere in 2021-2023 with 1s..10m steps.
fn arb_points() -> impl Strategy<Value = Vec<(i64, f64)>> {
    (
        1_610_000_000i64..1_700_000_000,
        prop::collection::vec((1i64..600, -100.0f64..100.0), 1..200),
    )
        .prop_map(|(start, steps)| {
            let mut cur = start;
            steps
                .into_iter()
                .map(|(d, v)| {
                    cur += d;
                    (cur, v)
                })
                .collect()
        })
}

fn series(samples: &[(i64, f64)], tz: Tz, unit: Option<&str>) -> Series {
    let points = samples
        .iter()
        .map(|&(s, v)| Point::single(DateTime::<Utc>::from_timestamp(s, 0).unwrap(), v))
        .collect();
    let s = Series::from_points(Schema::single("v").unwrap(), points, tz).unwrap();
    match unit {
        Some(u) => s.with_unit(u.parse().unwrap()).unwrap(),
        None => s,
    }
}

proptest! {
    #[test]
    fn resampled_slots_are_contiguous_and_unit_wide(samples in arb_points(), tz in arb_tz(), target in arb_target()) {
        let input = series(&samples, tz, None);
        let out = match resample(&input, target, &AggregationPolicy::default(), &CoveragePolicy::default()) {
            Ok(out) => out,
            Err(TimeslotError::UpsamplingNotSupported { .. }) => return Ok(()),
            Err(e) => return Err(TestCaseError::fail(e.to_string())),
        };
        let slots = out.slots().unwrap();
        prop_assert!(!slots.is_empty());
        for w in slots.windows(2) {
            prop_assert_eq!(w[0].end, w[1].start);
        }
        for s in slots {
            prop_assert_eq!(target.slot_end(s.start, tz).unwrap(), s.end);
            prop_assert!((0.0..=1.0).contains(&s.coverage));
        }
        // Every source point lands in some slot except possibly the last one
        // sitting exactly on the final boundary.
        let (first, last) = input.span().unwrap();
        prop_assert!(slots[0].start <= first);
        prop_assert!(slots[slots.len() - 1].end >= last);
        prop_assert!(out.check_invariants().is_ok());
    }

    #[test]
    fn reslot_to_own_unit_is_idempotent(samples in arb_points(), tz in arb_tz()) {
        let input = series(&samples, tz, Some("1m"));
        let target: TimeUnit = "15m".parse().unwrap();
        let once = resample(&input, target, &AggregationPolicy::default(), &CoveragePolicy::default()).unwrap();
        let twice = reslot(&once, target, &AggregationPolicy::default(), &CoveragePolicy::default()).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn removing_a_point_never_raises_coverage(
        samples in arb_points(),
        drop_seed in any::<usize>(),
        declared in prop::option::of(Just("1m")),
        target in prop::sample::select(vec!["5m", "1h"]),
    ) {
        prop_assume!(samples.len() >= 2);
        let target: TimeUnit = target.parse().unwrap();
        let policy = CoveragePolicy::default();
        let run = |s: &[(i64, f64)]| resample(&series(s, chrono_tz::UTC, declared), target, &AggregationPolicy::default(), &policy);

        let mut fewer = samples.clone();
        fewer.remove(drop_seed % samples.len());
        // Inferred cadences coarser than the target are refused on either side.
        let (before, after) = match (run(samples.as_slice()), run(fewer.as_slice())) {
            (Ok(before), Ok(after)) => (before, after),
            (Err(TimeslotError::UpsamplingNotSupported { .. }), _)
            | (_, Err(TimeslotError::UpsamplingNotSupported { .. })) => return Ok(()),
            (Err(e), _) | (_, Err(e)) => return Err(TestCaseError::fail(e.to_string())),
        };

        for slot in after.slots().unwrap() {
            if let Some(prev) = before.slots().unwrap().iter().find(|s| s.start == slot.start) {
                prop_assert!(slot.coverage <= prev.coverage + 1e-9,
                    "coverage rose from {} to {} at {}", prev.coverage, slot.coverage, slot.start);
            }
        }
    }
}
