//! Model input contracts.
//!
//! A model declares what it can consume (series kind, sampling interval,
//! value names, coverage, length) as an [`InputContract`]. The core checks
//! the contract with [`validate_input`]; pipelines may first normalize the
//! input by resampling it to the contract's `max_interval`.

use chrono::{DateTime, Datelike, Offset, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::gaps::GapDetector;
use crate::series::Series;
use crate::unit::{TimeUnit, UnitBase};
use crate::{GapConfig, SeriesKinds, TimeslotError};

/// Input requirements declared by a model.
///
/// ```
/// use timeslot_core::{InputContract, SeriesKinds};
///
/// let contract = InputContract::new("forecaster")
///     .kinds(SeriesKinds::SLOTS)
///     .max_interval("1h".parse().unwrap())
///     .require_value("temp")
///     .min_coverage(0.8)
///     .min_items(24);
/// assert_eq!(contract.min_items, 24);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputContract {
    /// Model name reported in violations.
    pub model: String,
    /// Accepted series kinds.
    pub kinds: SeriesKinds,
    /// Coarsest acceptable nominal sampling unit.
    pub max_interval: Option<TimeUnit>,
    /// Value names that must be part of the schema.
    pub required_values: Vec<String>,
    /// Minimum share of the series span backed by data.
    pub min_coverage: Option<f64>,
    /// Minimum number of items.
    pub min_items: usize,
}

impl InputContract {
    /// Permissive contract: any kind, any interval, at least one item.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            kinds: SeriesKinds::all(),
            max_interval: None,
            required_values: Vec::new(),
            min_coverage: None,
            min_items: 1,
        }
    }

    /// Restrict the accepted kinds.
    #[must_use]
    pub fn kinds(mut self, kinds: SeriesKinds) -> Self {
        self.kinds = kinds;
        self
    }

    /// Require sampling at least as fine as `unit`.
    #[must_use]
    pub fn max_interval(mut self, unit: TimeUnit) -> Self {
        self.max_interval = Some(unit);
        self
    }

    /// Require a value name.
    #[must_use]
    pub fn require_value(mut self, name: impl Into<String>) -> Self {
        self.required_values.push(name.into());
        self
    }

    /// Require a minimum coverage ratio.
    #[must_use]
    pub fn min_coverage(mut self, ratio: f64) -> Self {
        self.min_coverage = Some(ratio);
        self
    }

    /// Require a minimum number of items.
    #[must_use]
    pub fn min_items(mut self, n: usize) -> Self {
        self.min_items = n;
        self
    }
}

/// A forecasting, anomaly-detection or reconstruction model.
///
/// Models consume a series that satisfies their [`InputContract`] and
/// produce a series of the same kind.
pub trait Model: Send + Sync {
    /// Human-readable model name.
    fn name(&self) -> &'static str;

    /// Input requirements.
    fn contract(&self) -> InputContract;

    /// Run the model on a contract-satisfying series.
    ///
    /// # Errors
    /// Model-specific failures.
    fn run(&self, series: &Series) -> Result<Series, TimeslotError>;
}

/// Check `series` against `contract`, reporting the first violation.
///
/// Checks run in order: item count, kind, required values, sampling
/// interval, coverage. Intervals and gaps use the default [`GapConfig`].
///
/// # Errors
/// Returns `ContractViolation` naming the model and the violated requirement.
pub fn validate_input(series: &Series, contract: &InputContract) -> Result<(), TimeslotError> {
    validate_input_with(series, contract, &GapConfig::default())
}

/// As [`validate_input`], inferring the sampling interval and the point gaps
/// with `gap`.
///
/// # Errors
/// Returns `InvalidArg` for an out-of-range `gap`, otherwise
/// `ContractViolation` naming the model and the violated requirement.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        name = "timeslot::contract::validate_input",
        skip(series, contract, gap),
        fields(
            model = %contract.model,
            kind = %series.kind(),
            len = series.len(),
            tolerance = gap.tolerance,
        ),
    )
)]
pub fn validate_input_with(
    series: &Series,
    contract: &InputContract,
    gap: &GapConfig,
) -> Result<(), TimeslotError> {
    gap.validate()?;
    let violation = |reason: String| TimeslotError::contract(&contract.model, reason);

    if series.len() < contract.min_items {
        return Err(violation(format!(
            "needs at least {} items, got {}",
            contract.min_items,
            series.len()
        )));
    }
    if !contract.kinds.accepts(series.kind()) {
        return Err(violation(format!("does not accept a {} series", series.kind())));
    }
    if let Some(name) = contract
        .required_values
        .iter()
        .find(|n| !series.schema().contains(n))
    {
        return Err(violation(format!(
            "missing value '{name}' (schema {})",
            series.schema()
        )));
    }

    let detector = GapDetector::new(*gap);
    if let Some(max) = contract.max_interval {
        let nominal = detector
            .nominal(series)
            .map_err(|e| violation(format!("cannot determine sampling interval: {e}")))?;
        let Some(anchor) = series.first_instant() else {
            return Ok(());
        };
        if nominal != max && nominal.cmp_at(&max, anchor, series.tz())?.is_gt() {
            return Err(violation(format!("sampling interval {nominal} is coarser than {max}")));
        }
    }

    if let Some(min) = contract.min_coverage {
        let coverage = coverage_of(series, &detector)?;
        if coverage < min {
            return Err(violation(format!("coverage {coverage:.3} is below {min}")));
        }
    }
    Ok(())
}

/// Mean slot coverage, or the share of a point series' span outside gaps.
fn coverage_of(series: &Series, detector: &GapDetector) -> Result<f64, TimeslotError> {
    if let Some(slots) = series.slots() {
        if slots.is_empty() {
            return Ok(0.0);
        }
        #[allow(clippy::cast_precision_loss)]
        let mean = slots.iter().map(|s| s.coverage).sum::<f64>() / slots.len() as f64;
        return Ok(mean);
    }
    let Some((from, to)) = series.span() else {
        return Ok(0.0);
    };
    if series.len() < 2 {
        return Ok(0.0);
    }
    let report = detector.detect(series)?;
    Ok(1.0 - report.gap_ratio(to - from))
}

/// Position of `instant` within a repeating cycle of `period` units.
///
/// Counts whole `unit`s on the local wall clock of `tz` since the Unix epoch
/// and wraps them by `period`. Because counting happens on local time, a
/// daily-periodic model sees 08:00 as the same phase before and after a DST
/// switch.
///
/// ```
/// use chrono::TimeZone;
/// use timeslot_core::periodicity_index;
///
/// let rome = chrono_tz::Europe::Rome;
/// let hour = "1h".parse().unwrap();
/// let winter = rome.with_ymd_and_hms(2022, 1, 10, 8, 0, 0).unwrap().to_utc();
/// let summer = rome.with_ymd_and_hms(2022, 7, 10, 8, 0, 0).unwrap().to_utc();
/// assert_eq!(periodicity_index(winter, hour, 24, rome).unwrap(), 8);
/// assert_eq!(periodicity_index(summer, hour, 24, rome).unwrap(), 8);
/// ```
///
/// # Errors
/// Returns `InvalidArg` if `period` is zero.
pub fn periodicity_index(
    instant: DateTime<Utc>,
    unit: TimeUnit,
    period: usize,
    tz: Tz,
) -> Result<usize, TimeslotError> {
    if period == 0 {
        return Err(TimeslotError::InvalidArg("period must be positive".into()));
    }
    let local = instant.with_timezone(&tz);
    let date = local.date_naive();
    let epoch = DateTime::UNIX_EPOCH.date_naive();
    let n = i64::from(unit.magnitude());
    let count = match unit.base() {
        UnitBase::Second | UnitBase::Minute | UnitBase::Hour => {
            let wall = instant.timestamp() + i64::from(local.offset().fix().local_minus_utc());
            let step = unit
                .fixed_duration()
                .map_or(1, |d| d.num_seconds())
                .max(1);
            return wrap(wall.div_euclid(step), period);
        }
        UnitBase::Day => (date - epoch).num_days(),
        // 1970-01-01 is a Thursday; count weeks from the Monday before it.
        UnitBase::Week => (date - epoch + TimeDelta::days(3)).num_days().div_euclid(7),
        UnitBase::Month => i64::from(date.year() - 1970) * 12 + i64::from(date.month0()),
        UnitBase::Year => i64::from(date.year() - 1970),
    };
    wrap(count.div_euclid(n), period)
}

fn wrap(count: i64, period: usize) -> Result<usize, TimeslotError> {
    let period_i = i64::try_from(period)
        .map_err(|_| TimeslotError::InvalidArg(format!("period {period} is too large")))?;
    usize::try_from(count.rem_euclid(period_i))
        .map_err(|_| TimeslotError::InvalidArg(format!("period {period} is too large")))
}
