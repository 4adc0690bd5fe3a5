//! Points, slots and the immutable `Series` container.

use core::fmt;
use core::ops::Range;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::gaps::GapReport;
use crate::unit::TimeUnit;
use crate::{SeriesKind, TimeslotError};

/// Ordered list of unique value names shared by every item of a series.
///
/// Cloning is cheap: names live behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Schema {
    names: Arc<[String]>,
}

impl Schema {
    /// Build a schema from value names.
    ///
    /// # Errors
    /// Returns `InvalidArg` if no names are given, or if a name is empty or
    /// repeated.
    pub fn new<I, S>(names: I) -> Result<Self, TimeslotError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(TimeslotError::InvalidArg(
                "schema needs at least one value name".into(),
            ));
        }
        for (i, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err(TimeslotError::InvalidArg(format!(
                    "value name #{i} is empty"
                )));
            }
            if names[..i].contains(name) {
                return Err(TimeslotError::InvalidArg(format!(
                    "duplicate value name '{name}'"
                )));
            }
        }
        Ok(Self {
            names: names.into(),
        })
    }

    /// Schema with a single value name.
    ///
    /// # Errors
    /// Returns `InvalidArg` if `name` is empty.
    pub fn single(name: impl Into<String>) -> Result<Self, TimeslotError> {
        Self::new([name.into()])
    }

    /// Number of values per item.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a constructed schema; provided for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Value names in declaration order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Position of `name`, if declared.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Whether `name` is declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }
}

impl TryFrom<Vec<String>> for Schema {
    type Error = TimeslotError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<Schema> for Vec<String> {
    fn from(schema: Schema) -> Self {
        schema.names.to_vec()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.names.join(", "))
    }
}

/// A punctual observation.
///
/// Values are positional, following the schema of the owning series. `None`
/// marks a missing or invalid value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Observation instant.
    pub ts: DateTime<Utc>,
    /// One entry per schema name.
    pub values: Vec<Option<f64>>,
}

impl Point {
    /// Point with the given values.
    #[must_use]
    pub const fn new(ts: DateTime<Utc>, values: Vec<Option<f64>>) -> Self {
        Self { ts, values }
    }

    /// Point carrying a single present value.
    #[must_use]
    pub fn single(ts: DateTime<Utc>, value: f64) -> Self {
        Self::new(ts, vec![Some(value)])
    }

    /// Value at schema position `i`.
    #[must_use]
    pub fn value(&self, i: usize) -> Option<f64> {
        self.values.get(i).copied().flatten()
    }
}

/// An interval `[start, end)` with aggregated values and a coverage ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Exclusive end.
    pub end: DateTime<Utc>,
    /// One entry per schema name.
    pub values: Vec<Option<f64>>,
    /// Fraction of the interval backed by source data, in `[0, 1]`.
    pub coverage: f64,
    /// Whether the coverage met the policy that produced the slot.
    pub valid: bool,
    /// Values were filled in rather than aggregated from source data.
    pub reconstructed: bool,
}

impl Slot {
    /// Fully covered, valid slot.
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>, values: Vec<Option<f64>>) -> Self {
        Self {
            start,
            end,
            values,
            coverage: 1.0,
            valid: true,
            reconstructed: false,
        }
    }

    /// Replace the coverage ratio.
    #[must_use]
    pub const fn with_coverage(mut self, coverage: f64) -> Self {
        self.coverage = coverage;
        self
    }

    /// Replace the validity flag.
    #[must_use]
    pub const fn with_validity(mut self, valid: bool) -> Self {
        self.valid = valid;
        self
    }

    /// Physical width.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// `1 - coverage`.
    #[must_use]
    pub fn data_loss(&self) -> f64 {
        1.0 - self.coverage
    }

    /// Whether `ts` falls in `[start, end)`.
    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }

    /// Length of the intersection with `[from, to)`; zero when disjoint.
    #[must_use]
    pub fn overlap(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> TimeDelta {
        let lo = self.start.max(from);
        let hi = self.end.min(to);
        if hi > lo { hi - lo } else { TimeDelta::zero() }
    }

    /// Value at schema position `i`.
    #[must_use]
    pub fn value(&self, i: usize) -> Option<f64> {
        self.values.get(i).copied().flatten()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Items {
    Points(Vec<Point>),
    Slots(Vec<Slot>),
}

/// Borrowed view of one series item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Item<'a> {
    /// A point of a points-kind series.
    Point(&'a Point),
    /// A slot of a slots-kind series.
    Slot(&'a Slot),
}

impl Item<'_> {
    /// Timestamp of a point, start of a slot.
    #[must_use]
    pub const fn instant(&self) -> DateTime<Utc> {
        match self {
            Item::Point(p) => p.ts,
            Item::Slot(s) => s.start,
        }
    }

    /// Positional values.
    #[must_use]
    pub fn values(&self) -> &[Option<f64>] {
        match self {
            Item::Point(p) => &p.values,
            Item::Slot(s) => &s.values,
        }
    }
}

/// Iterator over the items of a [`Series`].
#[derive(Debug, Clone)]
pub enum Iter<'a> {
    /// Points-kind iteration.
    Points(core::slice::Iter<'a, Point>),
    /// Slots-kind iteration.
    Slots(core::slice::Iter<'a, Slot>),
}

impl<'a> Iterator for Iter<'a> {
    type Item = Item<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Iter::Points(it) => it.next().map(Item::Point),
            Iter::Slots(it) => it.next().map(Item::Slot),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Iter::Points(it) => it.size_hint(),
            Iter::Slots(it) => it.size_hint(),
        }
    }
}

impl ExactSizeIterator for Iter<'_> {}

/// An ordered, timestamp-unique sequence of points or slots.
///
/// A series never mixes points and slots, and never changes kind. It is
/// immutable: every derivation returns a new value. Construction validates
/// ordering, uniqueness, schema arity, value finiteness and, for slots,
/// interval well-formedness and width against the declared unit.
///
/// ```
/// use chrono::DateTime;
/// use timeslot_core::{Point, Schema, Series, SeriesKind};
///
/// let t = |s| DateTime::from_timestamp(s, 0).unwrap();
/// let schema = Schema::single("temp").unwrap();
/// let s = Series::from_points(
///     schema,
///     vec![Point::single(t(0), 10.0), Point::single(t(60), 11.0)],
///     chrono_tz::UTC,
/// )
/// .unwrap();
/// assert_eq!(s.kind(), SeriesKind::Points);
/// assert_eq!(s.len(), 2);
///
/// // Out-of-order input is rejected eagerly.
/// let bad = vec![Point::single(t(60), 1.0), Point::single(t(0), 2.0)];
/// assert!(Series::from_points(s.schema().clone(), bad, chrono_tz::UTC).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    tz: Tz,
    schema: Schema,
    unit: Option<TimeUnit>,
    items: Items,
    gaps: Option<GapReport>,
    title: Option<String>,
}

impl Series {
    /// Points-kind series.
    ///
    /// # Errors
    /// Returns `MalformedSeries` naming the first offending point.
    pub fn from_points(schema: Schema, points: Vec<Point>, tz: Tz) -> Result<Self, TimeslotError> {
        validate_points(&schema, &points)?;
        Ok(Self {
            tz,
            schema,
            unit: None,
            items: Items::Points(points),
            gaps: None,
            title: None,
        })
    }

    /// Slots-kind series. When `unit` is given, every slot must span exactly
    /// one unit from its own start in `tz`.
    ///
    /// # Errors
    /// Returns `MalformedSeries` naming the first offending slot.
    pub fn from_slots(
        schema: Schema,
        slots: Vec<Slot>,
        tz: Tz,
        unit: Option<TimeUnit>,
    ) -> Result<Self, TimeslotError> {
        validate_slots(&schema, &slots, tz, unit)?;
        Ok(Self {
            tz,
            schema,
            unit,
            items: Items::Slots(slots),
            gaps: None,
            title: None,
        })
    }

    /// Points or slots.
    #[must_use]
    pub const fn kind(&self) -> SeriesKind {
        match self.items {
            Items::Points(_) => SeriesKind::Points,
            Items::Slots(_) => SeriesKind::Slots,
        }
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.items {
            Items::Points(p) => p.len(),
            Items::Slots(s) => s.len(),
        }
    }

    /// Whether the series holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Timezone used for calendar arithmetic and display.
    #[must_use]
    pub const fn tz(&self) -> Tz {
        self.tz
    }

    /// Value schema.
    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Declared nominal unit, if any.
    #[must_use]
    pub const fn unit(&self) -> Option<TimeUnit> {
        self.unit
    }

    /// Optional human-readable title.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Points of a points-kind series.
    #[must_use]
    pub fn points(&self) -> Option<&[Point]> {
        match &self.items {
            Items::Points(p) => Some(p),
            Items::Slots(_) => None,
        }
    }

    /// Slots of a slots-kind series.
    #[must_use]
    pub fn slots(&self) -> Option<&[Slot]> {
        match &self.items {
            Items::Slots(s) => Some(s),
            Items::Points(_) => None,
        }
    }

    /// Borrowed items in order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        match &self.items {
            Items::Points(p) => Iter::Points(p.iter()),
            Items::Slots(s) => Iter::Slots(s.iter()),
        }
    }

    /// Item instants in order (point timestamps or slot starts).
    #[must_use]
    pub fn instants(&self) -> Vec<DateTime<Utc>> {
        self.iter().map(|i| i.instant()).collect()
    }

    /// Instant of the first item.
    #[must_use]
    pub fn first_instant(&self) -> Option<DateTime<Utc>> {
        self.iter().next().map(|i| i.instant())
    }

    /// Instant of the last item.
    #[must_use]
    pub fn last_instant(&self) -> Option<DateTime<Utc>> {
        match &self.items {
            Items::Points(p) => p.last().map(|p| p.ts),
            Items::Slots(s) => s.last().map(|s| s.start),
        }
    }

    /// Covered time range: first to last timestamp for points, first start
    /// to last end for slots.
    #[must_use]
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match &self.items {
            Items::Points(p) => Some((p.first()?.ts, p.last()?.ts)),
            Items::Slots(s) => Some((s.first()?.start, s.last()?.end)),
        }
    }

    /// Column of values for `name`, or `None` if the name is not declared.
    #[must_use]
    pub fn values_of(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let i = self.schema.index_of(name)?;
        Some(self.iter().map(|item| item.values()[i]).collect())
    }

    /// Gap annotations attached by a gap detection step.
    #[must_use]
    pub const fn gaps(&self) -> Option<&GapReport> {
        self.gaps.as_ref()
    }

    /// Same items displayed in another timezone.
    ///
    /// # Errors
    /// Returns `MalformedSeries` if the series is slot-kind with a declared
    /// calendar unit whose slot widths do not hold in `tz`.
    pub fn with_tz(mut self, tz: Tz) -> Result<Self, TimeslotError> {
        self.tz = tz;
        self.check_invariants()?;
        Ok(self)
    }

    /// Declare the nominal unit.
    ///
    /// # Errors
    /// Returns `MalformedSeries` if the series is slot-kind and a slot does not
    /// span exactly one `unit`.
    pub fn with_unit(mut self, unit: TimeUnit) -> Result<Self, TimeslotError> {
        self.unit = Some(unit);
        self.check_invariants()?;
        Ok(self)
    }

    /// Attach a title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Attach a gap report.
    #[must_use]
    pub fn with_gaps(mut self, gaps: GapReport) -> Self {
        self.gaps = Some(gaps);
        self
    }

    /// Items whose instant falls in `[from, to)`. Gap annotations are dropped.
    #[must_use]
    pub fn slice(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        let within = |t: DateTime<Utc>| from <= t && t < to;
        let items = match &self.items {
            Items::Points(p) => Items::Points(p.iter().filter(|p| within(p.ts)).cloned().collect()),
            Items::Slots(s) => Items::Slots(s.iter().filter(|s| within(s.start)).cloned().collect()),
        };
        self.derive(items)
    }

    /// Items at positions `range`. Gap annotations are dropped.
    ///
    /// # Errors
    /// Returns `InvalidArg` if the range is out of bounds or reversed.
    pub fn slice_index(&self, range: Range<usize>) -> Result<Self, TimeslotError> {
        if range.start > range.end || range.end > self.len() {
            return Err(TimeslotError::InvalidArg(format!(
                "index range {}..{} out of bounds for {} items",
                range.start,
                range.end,
                self.len()
            )));
        }
        let items = match &self.items {
            Items::Points(p) => Items::Points(p[range].to_vec()),
            Items::Slots(s) => Items::Slots(s[range].to_vec()),
        };
        Ok(self.derive(items))
    }

    /// Re-check every construction invariant.
    ///
    /// # Errors
    /// Returns `MalformedSeries` naming the first offending item.
    pub fn check_invariants(&self) -> Result<(), TimeslotError> {
        match &self.items {
            Items::Points(p) => validate_points(&self.schema, p),
            Items::Slots(s) => validate_slots(&self.schema, s, self.tz, self.unit),
        }
    }

    fn derive(&self, items: Items) -> Self {
        Self {
            tz: self.tz,
            schema: self.schema.clone(),
            unit: self.unit,
            items,
            gaps: None,
            title: self.title.clone(),
        }
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = Item<'a>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} series of #{} items in {}", self.kind(), self.len(), self.tz)?;
        if let Some((a, b)) = self.span() {
            write!(
                f,
                ", from {} to {}",
                a.with_timezone(&self.tz),
                b.with_timezone(&self.tz)
            )?;
        }
        Ok(())
    }
}

fn check_values(
    schema: &Schema,
    index: usize,
    values: &[Option<f64>],
    at: DateTime<Utc>,
) -> Result<(), TimeslotError> {
    if values.len() != schema.len() {
        return Err(TimeslotError::malformed(
            index,
            format!(
                "expected {} values {schema}, got {} at {at}",
                schema.len(),
                values.len()
            ),
        ));
    }
    if let Some(pos) = values.iter().position(|v| v.is_some_and(|v| !v.is_finite())) {
        return Err(TimeslotError::malformed(
            index,
            format!(
                "value '{}' at {at} is not finite",
                schema.names()[pos]
            ),
        ));
    }
    Ok(())
}

fn validate_points(schema: &Schema, points: &[Point]) -> Result<(), TimeslotError> {
    for (i, p) in points.iter().enumerate() {
        check_values(schema, i, &p.values, p.ts)?;
        if i > 0 {
            let prev = points[i - 1].ts;
            if p.ts == prev {
                return Err(TimeslotError::malformed(
                    i,
                    format!("duplicate timestamp {}", p.ts),
                ));
            }
            if p.ts < prev {
                return Err(TimeslotError::malformed(
                    i,
                    format!("timestamp {} is not after previous {prev}", p.ts),
                ));
            }
        }
    }
    Ok(())
}

fn validate_slots(
    schema: &Schema,
    slots: &[Slot],
    tz: Tz,
    unit: Option<TimeUnit>,
) -> Result<(), TimeslotError> {
    for (i, s) in slots.iter().enumerate() {
        check_values(schema, i, &s.values, s.start)?;
        if s.end <= s.start {
            return Err(TimeslotError::malformed(
                i,
                format!("slot end {} is not after start {}", s.end, s.start),
            ));
        }
        if !(0.0..=1.0).contains(&s.coverage) {
            return Err(TimeslotError::malformed(
                i,
                format!("coverage {} of slot at {} is outside [0, 1]", s.coverage, s.start),
            ));
        }
        if i > 0 {
            let prev = &slots[i - 1];
            if s.start == prev.start {
                return Err(TimeslotError::malformed(
                    i,
                    format!("duplicate slot start {}", s.start),
                ));
            }
            if s.start < prev.end {
                return Err(TimeslotError::malformed(
                    i,
                    format!(
                        "slot starting {} overlaps or precedes previous slot [{}, {})",
                        s.start, prev.start, prev.end
                    ),
                ));
            }
        }
        if let Some(unit) = unit {
            let expected = unit.slot_end(s.start, tz)?;
            if expected != s.end {
                return Err(TimeslotError::malformed(
                    i,
                    format!(
                        "slot [{}, {}) does not span one {unit} in {tz} (expected end {expected})",
                        s.start, s.end
                    ),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(s, 0).unwrap()
    }

    #[test]
    fn schema_rejects_duplicates() {
        let err = Schema::new(["a", "b", "a"]).unwrap_err();
        assert!(matches!(err, TimeslotError::InvalidArg(_)));
    }

    #[test]
    fn nan_values_are_rejected() {
        let schema = Schema::single("v").unwrap();
        let err = Series::from_points(schema, vec![Point::single(t(0), f64::NAN)], chrono_tz::UTC)
            .unwrap_err();
        assert!(matches!(err, TimeslotError::MalformedSeries { index: 0, .. }));
    }

    #[test]
    fn overlapping_slots_are_rejected() {
        let schema = Schema::single("v").unwrap();
        let slots = vec![
            Slot::new(t(0), t(60), vec![Some(1.0)]),
            Slot::new(t(30), t(90), vec![Some(2.0)]),
        ];
        let err = Series::from_slots(schema, slots, chrono_tz::UTC, None).unwrap_err();
        assert!(matches!(err, TimeslotError::MalformedSeries { index: 1, .. }));
    }

    #[test]
    fn slot_width_must_match_declared_unit() {
        let schema = Schema::single("v").unwrap();
        let slots = vec![Slot::new(t(0), t(120), vec![Some(1.0)])];
        let unit: TimeUnit = "1m".parse().unwrap();
        let err = Series::from_slots(schema, slots, chrono_tz::UTC, Some(unit)).unwrap_err();
        assert!(matches!(err, TimeslotError::MalformedSeries { index: 0, .. }));
    }

    #[test]
    fn display_summarizes_kind_length_and_span() {
        let schema = Schema::single("v").unwrap();
        let s = Series::from_points(
            schema,
            vec![Point::single(t(0), 1.0), Point::single(t(60), 2.0)],
            chrono_tz::UTC,
        )
        .unwrap();
        assert_eq!(
            s.to_string(),
            "points series of #2 items in UTC, from 1970-01-01 00:00:00 UTC to 1970-01-01 00:01:00 UTC"
        );
    }
}
