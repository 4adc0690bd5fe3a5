use std::sync::{Mutex, PoisonError};

use timeslot_core::{InputContract, Model, Point, Series, Slot, TimeslotError};

/// What [`MockModel::run`] does with a contract-satisfying input.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelBehavior {
    /// Return the input unchanged.
    Echo,
    /// Return the input with every value replaced by the constant.
    Constant(f64),
    /// Fail with the provided error.
    Fail(TimeslotError),
}

/// Scriptable model with a configurable contract that records its inputs.
#[derive(Debug)]
pub struct MockModel {
    name: &'static str,
    contract: InputContract,
    behavior: ModelBehavior,
    inputs: Mutex<Vec<Series>>,
}

impl MockModel {
    /// Echoing model with a permissive contract.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            contract: InputContract::new(name),
            behavior: ModelBehavior::Echo,
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Replace the input contract.
    #[must_use]
    pub fn with_contract(mut self, contract: InputContract) -> Self {
        self.contract = contract;
        self
    }

    /// Replace the run behavior.
    #[must_use]
    pub fn with_behavior(mut self, behavior: ModelBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Every series the model was run on, oldest first.
    pub fn inputs(&self) -> Vec<Series> {
        self.inputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Model for MockModel {
    fn name(&self) -> &'static str {
        self.name
    }

    fn contract(&self) -> InputContract {
        self.contract.clone()
    }

    fn run(&self, series: &Series) -> Result<Series, TimeslotError> {
        self.inputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(series.clone());
        match &self.behavior {
            ModelBehavior::Echo => Ok(series.clone()),
            ModelBehavior::Fail(err) => Err(err.clone()),
            ModelBehavior::Constant(c) => constant(series, *c),
        }
    }
}

fn constant(series: &Series, c: f64) -> Result<Series, TimeslotError> {
    let fill = |values: &[Option<f64>]| vec![Some(c); values.len()];
    let out = if let Some(points) = series.points() {
        let points = points
            .iter()
            .map(|p| Point::new(p.ts, fill(&p.values)))
            .collect();
        Series::from_points(series.schema().clone(), points, series.tz())?
    } else {
        let slots = series
            .slots()
            .unwrap_or_default()
            .iter()
            .map(|s| Slot {
                values: fill(&s.values),
                ..s.clone()
            })
            .collect();
        Series::from_slots(series.schema().clone(), slots, series.tz(), series.unit())?
    };
    Ok(match series.title() {
        Some(title) => out.with_title(title),
        None => out,
    })
}
