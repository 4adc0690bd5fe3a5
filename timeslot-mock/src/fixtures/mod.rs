use chrono::NaiveDate;
use timeslot_core::Series;

pub mod points;
pub mod slots;

/// Names accepted by [`by_name`].
pub const FIXTURE_NAMES: [&str; 6] = [
    "regular",
    "missing",
    "irregular",
    "noisy",
    "rome-spring",
    "rome-autumn",
];

/// Named fixture series.
///
/// Point fixtures start at the Unix epoch and sample every minute; the
/// `rome-*` fixtures are three days of hourly slots around the 2022 DST
/// switches in Europe/Rome.
#[must_use]
pub fn by_name(name: &str) -> Option<Series> {
    let epoch = chrono::DateTime::UNIX_EPOCH;
    let rome = chrono_tz::Europe::Rome;
    match name {
        "regular" => points::regular_points(epoch, 120, 60).ok(),
        "missing" => points::points_with_missing(epoch, 120, 60, &[10, 40, 41, 42]).ok(),
        "irregular" => points::irregular_points().ok(),
        "noisy" => points::noisy_points(7, epoch, 240, 60, 20, 0.1).ok(),
        "rome-spring" => slots::hourly_slots(rome, NaiveDate::from_ymd_opt(2022, 3, 26)?, 3, 1.0).ok(),
        "rome-autumn" => slots::hourly_slots(rome, NaiveDate::from_ymd_opt(2022, 10, 29)?, 3, 1.0).ok(),
        _ => None,
    }
}
