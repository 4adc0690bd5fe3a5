use timeslot::{AggregationPolicy, CoveragePolicy, resample};
use timeslot_demos::common::{load, print_slots};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Samples at 0s, 45s, 61s and 130s.
    let series = load("irregular")?;
    println!("{series}");

    let slots = resample(
        &series,
        "60s".parse()?,
        &AggregationPolicy::default(),
        &CoveragePolicy::with_min_coverage(0.5),
    )?;
    println!("{slots}");
    print_slots(&slots);

    // Peak per minute; observed samples win over boundary interpolation.
    let peak = resample(
        &series,
        "60s".parse()?,
        &AggregationPolicy::new("max"),
        &CoveragePolicy::default(),
    )?;
    println!("max per minute: {:?}", peak.values_of("v"));

    Ok(())
}
