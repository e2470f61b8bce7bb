//! Operator identifier to pipeline resolution.

use crate::config::OperatorConfig;
use crate::errors::{GridAggError, GridAggResult};
use crate::lookup::LookupContext;
use crate::pipeline::Pipeline;
use log::debug;
use std::fmt::Debug;

/// Builds the stage graph for a family of operators.
///
/// Each call to [`build`](PipelineFactory::build) returns an independently wired
/// pipeline so a single factory can serve many aggregators.
pub trait PipelineFactory: Debug + Send + Sync {
    /// Name used in log messages
    fn name(&self) -> &str;

    /// Whether this factory builds pipelines for `operator`
    fn supports(&self, operator: &str) -> bool;

    /// Validate `config` and wire a fresh pipeline.
    ///
    /// Configuration problems (variable counts, missing thresholds, unknown lookup
    /// tables) are reported here rather than when data arrives.
    fn build(&self, config: &OperatorConfig, lookup: &LookupContext) -> GridAggResult<Pipeline>;
}

/// An ordered set of factories. The first factory supporting an operator wins.
#[derive(Debug, Default)]
pub struct PipelineRegistry {
    factories: Vec<Box<dyn PipelineFactory>>,
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_factory(mut self, factory: impl PipelineFactory + 'static) -> Self {
        self.register(Box::new(factory));
        self
    }

    pub fn register(&mut self, factory: Box<dyn PipelineFactory>) {
        self.factories.push(factory);
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn supports(&self, operator: &str) -> bool {
        self.factories.iter().any(|factory| factory.supports(operator))
    }

    pub fn resolve(&self, operator: &str) -> GridAggResult<&dyn PipelineFactory> {
        let factory = self
            .factories
            .iter()
            .find(|factory| factory.supports(operator))
            .ok_or_else(|| GridAggError::UnknownOperator(operator.to_string()))?;
        debug!("Operator '{}' resolved to {}", operator, factory.name());
        Ok(factory.as_ref())
    }

    pub fn build(&self, config: &OperatorConfig, lookup: &LookupContext) -> GridAggResult<Pipeline> {
        self.resolve(&config.operator)?.build(config, lookup)
    }
}
