use std::sync::Arc;

use timeslot::{
    FillPolicy, InputContract, Pipeline, PipelineConfig, SeriesKinds, TimeUnit, periodicity_index,
    validate_input,
};
use timeslot_demos::common::{load, print_slots};
use timeslot_mock::MockModel;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let series = load("missing")?;
    let hour: TimeUnit = "1h".parse()?;

    let contract = InputContract::new("daily-profile")
        .kinds(SeriesKinds::SLOTS)
        .max_interval(hour)
        .min_coverage(0.5);
    if let Err(e) = validate_input(&series, &contract) {
        println!("raw input rejected: {e}");
    }

    let model = Arc::new(MockModel::new("daily-profile").with_contract(contract));
    let mut cfg = PipelineConfig::default();
    cfg.normalize_coverage.fill = FillPolicy::Interpolate;
    let pipeline = Pipeline::builder().model(model.clone()).config(cfg).build()?;
    let out = pipeline.run(&series)?;
    println!("model received {} slots", model.inputs().first().map_or(0, |s| s.len()));
    print_slots(&out);

    let tz = chrono_tz::Europe::Rome;
    for slot in out.slots().unwrap_or_default() {
        println!(
            "{} -> hour-of-day index {}",
            slot.start.with_timezone(&tz),
            periodicity_index(slot.start, hour, 24, tz)?
        );
    }

    Ok(())
}
