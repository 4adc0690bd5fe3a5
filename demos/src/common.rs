use timeslot::{PointRow, Series, Slot, ingest_points};

/// Load the demo input series.
///
/// Reads point rows as JSON from the file named by `TIMESLOT_DEMO_INPUT`
/// when set, otherwise returns the named mock fixture.
///
/// # Errors
/// Fails if the file cannot be read or parsed, or if `fixture` is unknown.
pub fn load(fixture: &str) -> Result<Series, Box<dyn std::error::Error>> {
    if let Ok(path) = std::env::var("TIMESLOT_DEMO_INPUT") {
        println!("--- (Reading points from {path}) ---");
        let rows: Vec<PointRow> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        return Ok(ingest_points(rows, chrono_tz::UTC)?);
    }
    timeslot_mock::by_name(fixture).ok_or_else(|| format!("unknown fixture '{fixture}'").into())
}

/// Print one slot per line in the series' timezone.
pub fn print_slots(series: &Series) {
    let tz = series.tz();
    for Slot {
        start,
        end,
        values,
        coverage,
        valid,
        reconstructed,
    } in series.slots().unwrap_or_default()
    {
        let values: Vec<String> = values
            .iter()
            .map(|v| v.map_or_else(|| "-".to_string(), |v| format!("{v:.2}")))
            .collect();
        println!(
            "{} .. {}  [{}]  coverage={coverage:.2}{}{}",
            start.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z"),
            end.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z"),
            values.join(", "),
            if *valid { "" } else { "  INVALID" },
            if *reconstructed { "  (reconstructed)" } else { "" },
        );
    }
}
