use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::series::{Point, Schema, Series, Slot};
use crate::unit::TimeUnit;
use crate::TimeslotError;

/// Raw point row: an offset-carrying timestamp and a value map.
///
/// Deserializes from JSON such as
/// `{"ts": "2024-03-31T01:00:00+01:00", "values": {"temp": 21.5}}`; a
/// `null` value is kept as missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRow {
    /// RFC 3339 timestamp with explicit offset.
    pub ts: DateTime<FixedOffset>,
    /// Values by name.
    pub values: BTreeMap<String, Option<f64>>,
}

/// Raw slot row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotRow {
    /// Inclusive start, RFC 3339 with explicit offset.
    pub start: DateTime<FixedOffset>,
    /// Exclusive end, RFC 3339 with explicit offset.
    pub end: DateTime<FixedOffset>,
    /// Values by name.
    pub values: BTreeMap<String, Option<f64>>,
    /// Coverage ratio; fully covered when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<f64>,
}

/// Build a points-kind series from raw rows.
///
/// The schema is taken from the first row's value names (in name order);
/// every later row must carry exactly the same names.
///
/// ```
/// use timeslot_core::{PointRow, ingest_points};
///
/// let rows: Vec<PointRow> = serde_json::from_str(r#"[
///     {"ts": "2024-01-01T00:00:00+01:00", "values": {"temp": 3.5}},
///     {"ts": "2024-01-01T01:00:00+01:00", "values": {"temp": null}}
/// ]"#).unwrap();
/// let series = ingest_points(rows, chrono_tz::Europe::Rome).unwrap();
/// assert_eq!(series.len(), 2);
/// assert_eq!(series.values_of("temp").unwrap(), vec![Some(3.5), None]);
/// ```
///
/// # Errors
/// - `InvalidArg` when `rows` is empty.
/// - `MalformedSeries` for value names differing from the first row's, or
///   for unsorted, duplicate or non-finite input.
pub fn ingest_points<I>(rows: I, tz: Tz) -> Result<Series, TimeslotError>
where
    I: IntoIterator<Item = PointRow>,
{
    let mut rows = rows.into_iter();
    let first = rows
        .next()
        .ok_or_else(|| TimeslotError::InvalidArg("no rows to ingest".into()))?;
    let schema = schema_of(&first.values)?;
    let points = core::iter::once(first)
        .chain(rows)
        .enumerate()
        .map(|(i, row)| {
            let values = conform(&schema, i, row.values)?;
            Ok(Point::new(row.ts.with_timezone(&Utc), values))
        })
        .collect::<Result<Vec<_>, TimeslotError>>()?;
    Series::from_points(schema, points, tz)
}

/// Build a slots-kind series from raw rows, optionally declaring its unit.
///
/// # Errors
/// As [`ingest_points`], plus `MalformedSeries` for overlapping slots,
/// out-of-range coverage or widths not matching `unit`.
pub fn ingest_slots<I>(rows: I, tz: Tz, unit: Option<TimeUnit>) -> Result<Series, TimeslotError>
where
    I: IntoIterator<Item = SlotRow>,
{
    let mut rows = rows.into_iter();
    let first = rows
        .next()
        .ok_or_else(|| TimeslotError::InvalidArg("no rows to ingest".into()))?;
    let schema = schema_of(&first.values)?;
    let slots = core::iter::once(first)
        .chain(rows)
        .enumerate()
        .map(|(i, row)| {
            let values = conform(&schema, i, row.values)?;
            let (start, end) = (row.start.with_timezone(&Utc), row.end.with_timezone(&Utc));
            Ok(Slot::new(start, end, values).with_coverage(row.coverage.unwrap_or(1.0)))
        })
        .collect::<Result<Vec<_>, TimeslotError>>()?;
    Series::from_slots(schema, slots, tz, unit)
}

fn schema_of(values: &BTreeMap<String, Option<f64>>) -> Result<Schema, TimeslotError> {
    Schema::new(values.keys().cloned()).map_err(|e| TimeslotError::malformed(0, e.to_string()))
}

fn conform(
    schema: &Schema,
    index: usize,
    mut values: BTreeMap<String, Option<f64>>,
) -> Result<Vec<Option<f64>>, TimeslotError> {
    let out: Vec<Option<f64>> = schema
        .names()
        .iter()
        .map(|n| values.remove(n).ok_or(n))
        .collect::<Result<_, _>>()
        .map_err(|missing| {
            TimeslotError::malformed(index, format!("missing value '{missing}' (schema {schema})"))
        })?;
    if let Some(extra) = values.keys().next() {
        return Err(TimeslotError::malformed(
            index,
            format!("unexpected value '{extra}' (schema {schema})"),
        ));
    }
    Ok(out)
}
