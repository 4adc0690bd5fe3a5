use timeslot::{GapDetector, GapKind, detect_gaps, estimate_step_seconds};
use timeslot_demos::common::load;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let series = load("missing")?;
    println!("{series}");
    println!("estimated step: {:?}s", estimate_step_seconds(&series.instants()));

    let report = detect_gaps(&series, Some(1.5))?;
    println!("nominal unit: {}", report.nominal);
    for gap in &report.gaps {
        let kind = match gap.kind {
            GapKind::MissingData => "missing data",
            GapKind::LowCoverage => "low coverage",
            GapKind::Discontinuity => "discontinuity",
            _ => "other",
        };
        println!(
            "{} .. {}  {kind}: expected {} items, got {}",
            gap.start, gap.end, gap.expected_items, gap.actual_items
        );
    }
    if let Some((from, to)) = series.span() {
        println!("gap ratio: {:.3}", report.gap_ratio(to - from));
    }

    // Slots report under-covered regions instead.
    let noisy = load("noisy")?;
    let slots = timeslot::Resampler::new("10m".parse()?).run(&noisy)?;
    let slot_report = GapDetector::default().detect(&slots)?;
    println!("{} low-coverage regions in {slots}", slot_report.gaps.len());

    Ok(())
}
