use chrono::{NaiveDate, TimeZone};
use chrono_tz::Tz;
use timeslot_core::{Schema, Series, Slot, TimeUnit, TimeslotError, UnitBase};

/// Fully covered hourly `energy` slots, each holding `value`, over `days`
/// local days of `tz` starting at local midnight of `from`.
///
/// A day containing a DST switch gets 23 or 25 slots.
///
/// # Errors
/// `InvalidArg` if local midnight of `from` does not exist in `tz`, and
/// `InvalidUnit` if `days` is zero.
pub fn hourly_slots(tz: Tz, from: NaiveDate, days: u32, value: f64) -> Result<Series, TimeslotError> {
    let start = from
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| tz.from_local_datetime(&midnight).earliest())
        .ok_or_else(|| TimeslotError::InvalidArg(format!("no local midnight on {from} in {tz}")))?
        .to_utc();
    let end = TimeUnit::new(i64::from(days), UnitBase::Day)?.shift(start, tz)?;

    let hour = TimeUnit::new(1, UnitBase::Hour)?;
    let bounds: Vec<_> = hour.boundaries(start, tz)?.take_while(|b| *b <= end).collect();
    let slots = bounds
        .windows(2)
        .map(|w| Slot::new(w[0], w[1], vec![Some(value)]))
        .collect();
    Ok(Series::from_slots(Schema::single("energy")?, slots, tz, Some(hour))?.with_title("hourly energy"))
}
