use std::sync::Arc;

use timeslot::{GapAnnotator, Pipeline, Resampler};
use timeslot_demos::common::load;
use tracing_subscriber::fmt::format::FmtSpan;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize a human-friendly tracing subscriber with env-based filtering.
    // Suggested: RUST_LOG=info,timeslot=trace,timeslot_core=trace
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
        .try_init();

    let series = load("noisy")?;
    tracing::info!(%series, "loaded input");

    let pipeline = Pipeline::builder()
        .then(Arc::new(GapAnnotator::default()))
        .then(Arc::new(Resampler::new("15m".parse()?)))
        .build()?;
    let out = pipeline.run(&series)?;
    tracing::info!(%out, "pipeline finished");
    println!("{out}");

    Ok(())
}
