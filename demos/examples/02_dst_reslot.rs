use timeslot::{AggregationPolicy, CoveragePolicy, TimeUnit, reslot};
use timeslot_demos::common::{load, print_slots};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Three days of hourly slots around the Europe/Rome spring-forward switch.
    let hourly = load("rome-spring")?;
    println!("{hourly}");

    let day: TimeUnit = "1D".parse()?;
    let daily = reslot(
        &hourly,
        day,
        &AggregationPolicy::new("count"),
        &CoveragePolicy::default(),
    )?;
    println!("hourly slots per local day:");
    print_slots(&daily);

    for slot in daily.slots().unwrap_or_default() {
        println!(
            "{}: {} physical hours",
            slot.start.with_timezone(&daily.tz()).date_naive(),
            slot.duration().num_hours()
        );
    }

    let autumn = load("rome-autumn")?;
    let energy = reslot(&autumn, day, &AggregationPolicy::new("sum"), &CoveragePolicy::default())?;
    println!("energy per day across the fall-back switch: {:?}", energy.values_of("energy"));

    Ok(())
}
