//! Fixed and calendar time units with timezone- and DST-aware arithmetic.

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;

use chrono::offset::LocalResult;
use chrono::{
    DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, Offset, TimeDelta, TimeZone,
    Timelike, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::TimeslotError;

const DAY: i64 = 86_400;

/// Base of a time unit.
///
/// `Second`, `Minute` and `Hour` have a constant physical duration. `Day`,
/// `Week`, `Month` and `Year` are calendar bases: their physical duration
/// depends on the anchor instant and the timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitBase {
    /// One SI second.
    Second,
    /// Sixty seconds.
    Minute,
    /// 3600 seconds of physical time.
    Hour,
    /// From local midnight to the next local midnight (23, 24 or 25 hours).
    Day,
    /// Seven calendar days.
    Week,
    /// One calendar month (28 to 31 days).
    Month,
    /// One calendar year.
    Year,
}

impl UnitBase {
    /// Whether the physical duration depends on anchor and timezone.
    #[must_use]
    pub const fn is_calendar(self) -> bool {
        matches!(self, Self::Day | Self::Week | Self::Month | Self::Year)
    }

    const fn fixed_seconds(self) -> Option<i64> {
        match self {
            Self::Second => Some(1),
            Self::Minute => Some(60),
            Self::Hour => Some(3600),
            _ => None,
        }
    }

    const fn token(self) -> &'static str {
        match self {
            Self::Second => "s",
            Self::Minute => "m",
            Self::Hour => "h",
            Self::Day => "D",
            Self::Week => "W",
            Self::Month => "M",
            Self::Year => "Y",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        // `m` is minutes and `M` is months; every other token is case-insensitive.
        match token {
            "s" | "S" => Some(Self::Second),
            "m" => Some(Self::Minute),
            "h" | "H" => Some(Self::Hour),
            "d" | "D" => Some(Self::Day),
            "w" | "W" => Some(Self::Week),
            "M" => Some(Self::Month),
            "y" | "Y" => Some(Self::Year),
            _ => None,
        }
    }
}

/// A positive multiple of a [`UnitBase`], e.g. `15m`, `1h`, `1D`, `3M`.
///
/// Immutable value object. Serialized in its canonical string form.
///
/// ```
/// use timeslot_core::{TimeUnit, UnitBase};
///
/// let unit: TimeUnit = "15m".parse().unwrap();
/// assert_eq!(unit.magnitude(), 15);
/// assert_eq!(unit.base(), UnitBase::Minute);
/// assert!(!unit.is_calendar());
/// assert_eq!(unit.to_string(), "15m");
/// assert!("0h".parse::<TimeUnit>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeUnit {
    magnitude: u32,
    base: UnitBase,
}

impl TimeUnit {
    /// Build a unit from a magnitude and base.
    ///
    /// # Errors
    /// Returns `InvalidUnit` if `magnitude` is not strictly positive or does
    /// not fit in 32 bits.
    pub fn new(magnitude: i64, base: UnitBase) -> Result<Self, TimeslotError> {
        if magnitude <= 0 {
            return Err(TimeslotError::InvalidUnit(format!(
                "magnitude must be positive (got {magnitude}{})",
                base.token()
            )));
        }
        let magnitude = u32::try_from(magnitude).map_err(|_| {
            TimeslotError::InvalidUnit(format!("magnitude {magnitude} is too large"))
        })?;
        Ok(Self { magnitude, base })
    }

    /// The coarsest fixed unit that expresses `secs` exactly (`3600` → `1h`,
    /// `90` → `90s`, `86400` → `24h`).
    ///
    /// # Errors
    /// Returns `InvalidUnit` if `secs` is not strictly positive.
    pub fn from_seconds(secs: i64) -> Result<Self, TimeslotError> {
        if secs > 0 && secs % 3600 == 0 {
            Self::new(secs / 3600, UnitBase::Hour)
        } else if secs > 0 && secs % 60 == 0 {
            Self::new(secs / 60, UnitBase::Minute)
        } else {
            Self::new(secs, UnitBase::Second)
        }
    }

    /// Multiplier of the base.
    #[must_use]
    pub const fn magnitude(&self) -> u32 {
        self.magnitude
    }

    /// Base of the unit.
    #[must_use]
    pub const fn base(&self) -> UnitBase {
        self.base
    }

    /// Whether the physical duration depends on anchor and timezone.
    #[must_use]
    pub const fn is_calendar(&self) -> bool {
        self.base.is_calendar()
    }

    /// Constant physical duration of a fixed unit; `None` for calendar units.
    #[must_use]
    pub fn fixed_duration(&self) -> Option<TimeDelta> {
        self.fixed_seconds().map(TimeDelta::seconds)
    }

    fn fixed_seconds(&self) -> Option<i64> {
        self.base
            .fixed_seconds()
            .map(|s| s * i64::from(self.magnitude))
    }

    /// Compare two fixed units by nominal magnitude.
    ///
    /// Returns `None` when either unit is a calendar unit: those only compare
    /// at a concrete anchor, see [`TimeUnit::cmp_at`].
    #[must_use]
    pub fn partial_cmp_fixed(&self, other: &Self) -> Option<Ordering> {
        Some(self.fixed_seconds()?.cmp(&other.fixed_seconds()?))
    }

    /// Compare two units by their physical duration anchored at `anchor` in `tz`.
    ///
    /// # Errors
    /// Propagates errors from [`TimeUnit::physical_duration`].
    pub fn cmp_at(
        &self,
        other: &Self,
        anchor: DateTime<Utc>,
        tz: Tz,
    ) -> Result<Ordering, TimeslotError> {
        if let Some(ord) = self.partial_cmp_fixed(other) {
            return Ok(ord);
        }
        let a = self.physical_duration(anchor, tz)?;
        let b = other.physical_duration(anchor, tz)?;
        Ok(a.cmp(&b))
    }

    /// The next anchor after `anchor`.
    ///
    /// Fixed units add their constant duration. Calendar units add days,
    /// months or years to the local wall-clock time in `tz` and resolve the
    /// result back to an instant, so `1D` from local midnight always lands on
    /// the next local midnight regardless of DST.
    ///
    /// # Errors
    /// Returns `InvalidArg` if the result is outside the supported range.
    pub fn shift(&self, anchor: DateTime<Utc>, tz: Tz) -> Result<DateTime<Utc>, TimeslotError> {
        if let Some(step) = self.fixed_duration() {
            return anchor
                .checked_add_signed(step)
                .ok_or_else(|| out_of_range(anchor, self));
        }
        let local = anchor.with_timezone(&tz);
        let prefer = local.offset().fix().local_minus_utc();
        let naive = self
            .add_local(local.naive_local(), 1)
            .ok_or_else(|| out_of_range(anchor, self))?;
        Ok(resolve_local(tz, naive, Some(prefer)))
    }

    /// Physical time elapsed from `anchor` to `shift(anchor)`.
    ///
    /// ```
    /// use chrono::{TimeDelta, TimeZone};
    /// use timeslot_core::TimeUnit;
    ///
    /// let rome = chrono_tz::Europe::Rome;
    /// let day: TimeUnit = "1D".parse().unwrap();
    /// // 2022-03-27 is the spring-forward day in Europe/Rome.
    /// let midnight = rome.with_ymd_and_hms(2022, 3, 27, 0, 0, 0).unwrap().to_utc();
    /// assert_eq!(day.physical_duration(midnight, rome).unwrap(), TimeDelta::hours(23));
    /// ```
    ///
    /// # Errors
    /// Propagates errors from [`TimeUnit::shift`].
    pub fn physical_duration(&self, anchor: DateTime<Utc>, tz: Tz) -> Result<TimeDelta, TimeslotError> {
        if let Some(step) = self.fixed_duration() {
            return Ok(step);
        }
        Ok(self.shift(anchor, tz)? - anchor)
    }

    /// The timezone-aligned boundary at or before `instant`.
    ///
    /// Fixed units align to wall-clock multiples counted from local midnight;
    /// calendar units align to local midnight, Monday, the first of the month
    /// or January 1st, with multiples counted from the calendar origin.
    ///
    /// # Errors
    /// Returns `InvalidArg` if the boundary is outside the supported range.
    pub fn floor(&self, instant: DateTime<Utc>, tz: Tz) -> Result<DateTime<Utc>, TimeslotError> {
        let local = instant.with_timezone(&tz);
        let prefer = local.offset().fix().local_minus_utc();
        let naive = self
            .floor_local(local.naive_local())
            .ok_or_else(|| out_of_range(instant, self))?;
        let aligned = resolve_local(tz, naive, Some(prefer));
        // A boundary inside a spring-forward gap resolves past the gap; never
        // hand back an anchor later than the instant it was asked for.
        Ok(aligned.min(instant))
    }

    /// End of the slot that starts at `start`.
    ///
    /// Same as [`TimeUnit::shift`], except for a calendar boundary that a DST
    /// gap pushed off its wall-clock position (e.g. a skipped local midnight):
    /// its slot ends on the next aligned boundary rather than one unit after
    /// the displaced instant.
    ///
    /// # Errors
    /// Propagates errors from [`TimeUnit::shift`].
    pub fn slot_end(&self, start: DateTime<Utc>, tz: Tz) -> Result<DateTime<Utc>, TimeslotError> {
        if self.is_calendar() {
            let naive = start.with_timezone(&tz).naive_local();
            if let Some(aligned) = self.floor_local(naive)
                && aligned != naive
                && resolve_local(tz, aligned, None) == start
            {
                let next = self
                    .add_local(aligned, 1)
                    .ok_or_else(|| out_of_range(start, self))?;
                return Ok(resolve_local(tz, next, None));
            }
        }
        self.shift(start, tz)
    }

    /// Successive slot boundaries starting at `floor(from)`.
    ///
    /// Each boundary is the [`TimeUnit::slot_end`] of the previous one, so the
    /// slots they delimit satisfy the width check of slot series.
    ///
    /// # Errors
    /// Propagates errors from [`TimeUnit::floor`].
    pub fn boundaries(&self, from: DateTime<Utc>, tz: Tz) -> Result<Boundaries, TimeslotError> {
        Ok(Boundaries {
            unit: *self,
            tz,
            next: Some(self.floor(from, tz)?),
        })
    }

    fn add_local(&self, naive: NaiveDateTime, times: u32) -> Option<NaiveDateTime> {
        let n = self.magnitude.checked_mul(times)?;
        match self.base {
            UnitBase::Day => naive.checked_add_days(Days::new(u64::from(n))),
            UnitBase::Week => naive.checked_add_days(Days::new(u64::from(n) * 7)),
            UnitBase::Month => naive.checked_add_months(Months::new(n)),
            UnitBase::Year => naive.checked_add_months(Months::new(n.checked_mul(12)?)),
            UnitBase::Second | UnitBase::Minute | UnitBase::Hour => {
                let secs = self.fixed_seconds()?.checked_mul(i64::from(times))?;
                naive.checked_add_signed(TimeDelta::seconds(secs))
            }
        }
    }

    fn floor_local(&self, naive: NaiveDateTime) -> Option<NaiveDateTime> {
        let date = naive.date();
        let n = i64::from(self.magnitude);
        let start_date: NaiveDate = match self.base {
            UnitBase::Second | UnitBase::Minute | UnitBase::Hour => {
                let step = self.fixed_seconds()?;
                let secs = i64::from(naive.num_seconds_from_midnight());
                let bucket = secs - secs.rem_euclid(step);
                return date
                    .and_hms_opt(0, 0, 0)?
                    .checked_add_signed(TimeDelta::seconds(bucket));
            }
            UnitBase::Day => {
                let days = i64::from(date.num_days_from_ce());
                date.checked_sub_days(Days::new(u64::try_from(days.rem_euclid(n)).ok()?))?
            }
            UnitBase::Week => {
                let monday = date.checked_sub_days(Days::new(u64::from(
                    date.weekday().num_days_from_monday(),
                )))?;
                // 0001-01-01 is a Monday, so whole weeks count from there.
                let weeks = i64::from(monday.num_days_from_ce() - 1).div_euclid(7);
                let back = u64::try_from(weeks.rem_euclid(n) * 7).ok()?;
                monday.checked_sub_days(Days::new(back))?
            }
            UnitBase::Month => {
                let months = i64::from(date.year()) * 12 + i64::from(date.month0());
                let aligned = months - months.rem_euclid(n);
                let year = i32::try_from(aligned.div_euclid(12)).ok()?;
                let month = u32::try_from(aligned.rem_euclid(12)).ok()? + 1;
                NaiveDate::from_ymd_opt(year, month, 1)?
            }
            UnitBase::Year => {
                let year = i64::from(date.year());
                let aligned = i32::try_from(year - year.rem_euclid(n)).ok()?;
                NaiveDate::from_ymd_opt(aligned, 1, 1)?
            }
        };
        start_date.and_hms_opt(0, 0, 0)
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.magnitude, self.base.token())
    }
}

impl FromStr for TimeUnit {
    type Err = TimeslotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit() && c != '-' && c != '+')
            .ok_or_else(|| TimeslotError::InvalidUnit(format!("missing base token in '{s}'")))?;
        let (digits, token) = s.split_at(split);
        let magnitude: i64 = digits
            .parse()
            .map_err(|_| TimeslotError::InvalidUnit(format!("invalid magnitude in '{s}'")))?;
        let base = UnitBase::from_token(token.trim())
            .ok_or_else(|| TimeslotError::InvalidUnit(format!("unknown base token '{token}'")))?;
        Self::new(magnitude, base)
    }
}

impl TryFrom<String> for TimeUnit {
    type Error = TimeslotError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeUnit> for String {
    fn from(unit: TimeUnit) -> Self {
        unit.to_string()
    }
}

/// Iterator over slot boundaries produced by [`TimeUnit::boundaries`].
///
/// Ends early only if a boundary falls outside the supported time range.
#[derive(Debug, Clone)]
pub struct Boundaries {
    unit: TimeUnit,
    tz: Tz,
    next: Option<DateTime<Utc>>,
}

impl Iterator for Boundaries {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.next?;
        self.next = self.unit.slot_end(cur, self.tz).ok();
        Some(cur)
    }
}

/// Map a local wall-clock time to an instant.
///
/// Ambiguous times (fall-back overlap) keep `prefer_offset` when one of the
/// two mappings carries it, otherwise the earliest mapping wins. Nonexistent
/// times (spring-forward gap) are read with the offset in effect before the
/// transition, which lands just after the gap.
pub(crate) fn resolve_local(tz: Tz, naive: NaiveDateTime, prefer_offset: Option<i32>) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(early, late) => {
            let pick = match prefer_offset {
                Some(off) if late.offset().fix().local_minus_utc() == off => late,
                _ => early,
            };
            pick.with_timezone(&Utc)
        }
        LocalResult::None => {
            let earlier = naive.checked_sub_signed(TimeDelta::seconds(DAY)).unwrap_or(naive);
            let before = tz.offset_from_utc_datetime(&earlier).fix().local_minus_utc();
            let utc = naive
                .checked_sub_signed(TimeDelta::seconds(i64::from(before)))
                .unwrap_or(naive);
            Utc.from_utc_datetime(&utc)
        }
    }
}

fn out_of_range(at: DateTime<Utc>, unit: &TimeUnit) -> TimeslotError {
    TimeslotError::InvalidArg(format!("{unit} from {at} is outside the supported time range"))
}
