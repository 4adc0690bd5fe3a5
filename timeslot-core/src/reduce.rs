//! Reducers that combine the contributions gathered for one destination slot.
//!
//! A [`Reducer`] sees every [`Contribution`] for a single value column: real
//! samples plus, for point series, zero-share virtual samples at the slot
//! boundaries. Built-ins are looked up by name in a [`ReducerRegistry`].

use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::series::Schema;
use crate::{AggregationPolicy, TimeslotError};

/// One source value falling into a destination slot.
///
/// `weight` drives averaging (1 for a point, overlapped seconds for a source
/// slot). `share` is the fraction of the source value attributable to the
/// destination (1 for a point, overlap over source width for a slot).
/// Virtual contributions are synthesized at slot boundaries by interpolation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution {
    /// Source instant (point timestamp or slot start).
    pub at: DateTime<Utc>,
    /// Source value.
    pub value: f64,
    /// Averaging weight.
    pub weight: f64,
    /// Attributable fraction of `value`.
    pub share: f64,
    /// Synthesized at a boundary rather than observed.
    pub is_virtual: bool,
}

/// Combines the contributions gathered for one value of one destination slot.
///
/// Contributions arrive ordered by `at`. Returning `None` marks the value as
/// missing.
pub trait Reducer: Send + Sync + fmt::Debug {
    /// Name the reducer is registered under.
    fn name(&self) -> &str;

    /// Reduce the contributions to a single value.
    fn reduce(&self, contributions: &[Contribution]) -> Option<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    Mean,
    Sum,
    Min,
    Max,
    First,
    Last,
    Count,
    Median,
}

impl Builtin {
    const ALL: [Self; 8] = [
        Self::Mean,
        Self::Sum,
        Self::Min,
        Self::Max,
        Self::First,
        Self::Last,
        Self::Count,
        Self::Median,
    ];
}

/// Observed contributions, or the virtual ones when nothing was observed.
fn observed_or_all(c: &[Contribution]) -> impl Iterator<Item = &Contribution> {
    let any_real = c.iter().any(|c| !c.is_virtual);
    c.iter().filter(move |c| !any_real || !c.is_virtual)
}

impl Reducer for Builtin {
    fn name(&self) -> &str {
        match self {
            Self::Mean => "mean",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::First => "first",
            Self::Last => "last",
            Self::Count => "count",
            Self::Median => "median",
        }
    }

    fn reduce(&self, c: &[Contribution]) -> Option<f64> {
        match self {
            Self::Mean => {
                let (num, den) = c
                    .iter()
                    .fold((0.0, 0.0), |(n, d), c| (n + c.weight * c.value, d + c.weight));
                (den > 0.0).then(|| num / den)
            }
            Self::Sum => {
                let mut real = c.iter().filter(|c| !c.is_virtual).peekable();
                real.peek()?;
                Some(real.map(|c| c.value * c.share).sum())
            }
            Self::Min => observed_or_all(c).map(|c| c.value).reduce(f64::min),
            Self::Max => observed_or_all(c).map(|c| c.value).reduce(f64::max),
            Self::First => observed_or_all(c).next().map(|c| c.value),
            Self::Last => observed_or_all(c).last().map(|c| c.value),
            #[allow(clippy::cast_precision_loss)]
            Self::Count => Some(c.iter().filter(|c| !c.is_virtual).count() as f64),
            Self::Median => {
                let mut values: Vec<f64> = observed_or_all(c).map(|c| c.value).collect();
                if values.is_empty() {
                    return None;
                }
                values.sort_by(f64::total_cmp);
                let mid = values.len() / 2;
                Some(if values.len() % 2 == 0 {
                    (values[mid - 1] + values[mid]) / 2.0
                } else {
                    values[mid]
                })
            }
        }
    }
}

/// Reducer backed by a closure, see [`ReducerRegistry::register_fn`].
pub struct FnReducer<F> {
    name: String,
    f: F,
}

impl<F> fmt::Debug for FnReducer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnReducer").field("name", &self.name).finish()
    }
}

impl<F> Reducer for FnReducer<F>
where
    F: Fn(&[Contribution]) -> Option<f64> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn reduce(&self, contributions: &[Contribution]) -> Option<f64> {
        (self.f)(contributions)
    }
}

/// Named reducers available to aggregation policies.
///
/// Starts with the built-ins `mean` (weight-averaged), `sum` (share-weighted,
/// observed values only), `min`, `max`, `first`, `last`, `count` and
/// `median`. Custom reducers may be added or may replace a built-in.
///
/// ```
/// use timeslot_core::{Contribution, ReducerRegistry};
///
/// let mut registry = ReducerRegistry::default();
/// registry.register_fn("range", |c: &[Contribution]| {
///     let max = c.iter().map(|c| c.value).reduce(f64::max)?;
///     let min = c.iter().map(|c| c.value).reduce(f64::min)?;
///     Some(max - min)
/// });
/// assert!(registry.get("range").is_ok());
/// assert!(registry.get("mode").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ReducerRegistry {
    reducers: HashMap<String, Arc<dyn Reducer>>,
}

impl Default for ReducerRegistry {
    fn default() -> Self {
        let reducers = Builtin::ALL
            .into_iter()
            .map(|b| (b.name().to_string(), Arc::new(b) as Arc<dyn Reducer>))
            .collect();
        Self { reducers }
    }
}

impl ReducerRegistry {
    /// Registry with only the built-in reducers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a reducer under its own name.
    pub fn register(&mut self, reducer: Arc<dyn Reducer>) -> &mut Self {
        self.reducers.insert(reducer.name().to_string(), reducer);
        self
    }

    /// Add or replace a closure-backed reducer.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&[Contribution]) -> Option<f64> + Send + Sync + 'static,
    {
        self.register(Arc::new(FnReducer {
            name: name.into(),
            f,
        }))
    }

    /// Look up a reducer by name.
    ///
    /// # Errors
    /// Returns `UnknownAggregation` if nothing is registered under `name`.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Reducer>, TimeslotError> {
        self.reducers
            .get(name)
            .cloned()
            .ok_or_else(|| TimeslotError::UnknownAggregation(name.to_string()))
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.reducers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// One reducer per schema value, following `policy`.
    ///
    /// # Errors
    /// Returns `UnknownAggregation` for an unregistered reducer name and
    /// `InvalidArg` for an override naming a value absent from `schema`.
    pub fn resolve(
        &self,
        policy: &AggregationPolicy,
        schema: &Schema,
    ) -> Result<Vec<Arc<dyn Reducer>>, TimeslotError> {
        if let Some((value, _)) = policy.overrides().find(|(v, _)| !schema.contains(v)) {
            return Err(TimeslotError::InvalidArg(format!(
                "aggregation override for undeclared value '{value}' (schema {schema})"
            )));
        }
        schema
            .names()
            .iter()
            .map(|name| self.get(policy.reducer_for(name)))
            .collect()
    }
}
