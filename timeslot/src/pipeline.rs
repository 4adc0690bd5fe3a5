use std::sync::Arc;

use timeslot_core::{Model, Operation, Resampler, Series, validate_input_with};
use timeslot_types::{PipelineConfig, TimeslotError};

/// One registered step.
#[derive(Clone)]
enum Step {
    Op(Arc<dyn Operation>),
    Model(Arc<dyn Model>),
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Self::Op(op) => op.name(),
            Self::Model(model) => model.name(),
        }
    }
}

/// Introspection record for one pipeline step, see [`Pipeline::describe`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    /// Operation or model name.
    pub name: &'static str,
    /// Whether the step is a model (contract-checked) rather than an operation.
    pub is_model: bool,
    /// Operation configuration, or the model's input contract.
    pub config: serde_json::Value,
}

/// An ordered chain of operations and model steps.
///
/// Every step receives the previous step's output; the input series is
/// never modified.
pub struct Pipeline {
    steps: Vec<Step>,
    cfg: PipelineConfig,
}

/// Builder for a [`Pipeline`].
pub struct PipelineBuilder {
    steps: Vec<Step>,
    cfg: PipelineConfig,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    /// Empty builder with the default [`PipelineConfig`].
    ///
    /// Defaults re-check series invariants after every step and let model
    /// steps normalize their input by resampling to the contract's
    /// `max_interval`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            cfg: PipelineConfig::default(),
        }
    }

    /// Append an operation.
    #[must_use]
    pub fn then(mut self, op: Arc<dyn Operation>) -> Self {
        self.steps.push(Step::Op(op));
        self
    }

    /// Append a model step.
    ///
    /// The series reaching the step is checked against the model's
    /// [`InputContract`](timeslot_core::InputContract) before the model runs.
    #[must_use]
    pub fn model(mut self, model: Arc<dyn Model>) -> Self {
        self.steps.push(Step::Model(model));
        self
    }

    /// Replace the pipeline configuration.
    #[must_use]
    pub fn config(mut self, cfg: PipelineConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Build the pipeline.
    ///
    /// # Errors
    /// Returns `InvalidArg` if no step was registered or if the gap or
    /// normalization coverage settings are out of range.
    pub fn build(self) -> Result<Pipeline, TimeslotError> {
        if self.steps.is_empty() {
            return Err(TimeslotError::InvalidArg(
                "no steps registered; add at least one via then(...) or model(...)".to_string(),
            ));
        }
        self.cfg.gap.validate()?;
        self.cfg.normalize_coverage.validate()?;
        Ok(Pipeline {
            steps: self.steps,
            cfg: self.cfg,
        })
    }
}

impl Pipeline {
    /// Start building a new pipeline.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use timeslot::{GapAnnotator, Pipeline, Resampler};
    ///
    /// let pipeline = Pipeline::builder()
    ///     .then(Arc::new(GapAnnotator::default()))
    ///     .then(Arc::new(Resampler::new("1h".parse().unwrap())))
    ///     .build()
    ///     .unwrap();
    /// let names: Vec<_> = pipeline.describe().into_iter().map(|s| s.name).collect();
    /// assert_eq!(names, ["GapAnnotator", "Resampler"]);
    /// ```
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false for a built pipeline.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step names and configuration snapshots, in execution order.
    #[must_use]
    pub fn describe(&self) -> Vec<StepInfo> {
        self.steps
            .iter()
            .map(|step| {
                let (is_model, config) = match step {
                    Step::Op(op) => (false, op.config_json()),
                    Step::Model(model) => (
                        true,
                        serde_json::to_value(model.contract()).unwrap_or_default(),
                    ),
                };
                StepInfo {
                    name: step.name(),
                    is_model,
                    config,
                }
            })
            .collect()
    }

    /// Run every step in order on `series`.
    ///
    /// # Errors
    /// The first error reported by a step, `MalformedSeries` if a step's
    /// output breaks a series invariant (with `validate_steps` on), or
    /// `ContractViolation` if a model's input cannot be made to satisfy its
    /// contract.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "timeslot::pipeline::run",
            skip(self, series),
            fields(steps = self.steps.len(), kind = %series.kind(), len = series.len()),
        )
    )]
    pub fn run(&self, series: &Series) -> Result<Series, TimeslotError> {
        let mut current = series.clone();
        for step in &self.steps {
            current = match step {
                Step::Op(op) => op.apply(&current)?,
                Step::Model(model) => self.run_model(model.as_ref(), &current)?,
            };
            if self.cfg.validate_steps {
                current.check_invariants()?;
            }
            #[cfg(feature = "tracing")]
            tracing::debug!(
                step = step.name(),
                kind = %current.kind(),
                len = current.len(),
                "pipeline step done"
            );
        }
        Ok(current)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "timeslot::pipeline::model",
            skip(self, model, series),
            fields(model = model.name(), kind = %series.kind(), len = series.len()),
        )
    )]
    fn run_model(&self, model: &dyn Model, series: &Series) -> Result<Series, TimeslotError> {
        let contract = model.contract();
        let err = match validate_input_with(series, &contract, &self.cfg.gap) {
            Ok(()) => return model.run(series),
            Err(err @ TimeslotError::ContractViolation { .. }) => err,
            Err(other) => return Err(other),
        };
        let Some(target) = contract.max_interval.filter(|_| self.cfg.normalize_for_models) else {
            return Err(err);
        };

        #[cfg(feature = "tracing")]
        tracing::warn!(
            model = model.name(),
            unit = %target,
            error = %err,
            "input rejected by model contract; resampling"
        );
        let normalized = match Resampler::new(target)
            .aggregation(self.cfg.normalize_aggregation.clone())
            .coverage(self.cfg.normalize_coverage)
            .gap_config(self.cfg.gap)
            .run(series)
        {
            Ok(s) => s,
            Err(TimeslotError::UpsamplingNotSupported { .. }) => return Err(err),
            Err(other) => return Err(other),
        };
        validate_input_with(&normalized, &contract, &self.cfg.gap)?;
        model.run(&normalized)
    }
}
