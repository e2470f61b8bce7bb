//! Plain per-cell statistics and the two-variable derived operators.

use gridagg_core::config::OperatorConfig;
use gridagg_core::errors::GridAggResult;
use gridagg_core::lookup::LookupContext;
use gridagg_core::pipeline::{Collector, Pipeline, Statistic, Transform};
use gridagg_core::registry::PipelineFactory;

/// `none`: keeps the most recent slice of every input unchanged
#[derive(Debug, Default)]
pub struct CachingFactory;

impl PipelineFactory for CachingFactory {
    fn name(&self) -> &str {
        "CachingFactory"
    }

    fn supports(&self, operator: &str) -> bool {
        operator == "none"
    }

    fn build(&self, config: &OperatorConfig, _lookup: &LookupContext) -> GridAggResult<Pipeline> {
        let variables = config.inputs.len();
        if variables == 0 || config.outputs.len() != variables {
            return config.count_mismatch("one output per input");
        }
        Pipeline::single_collector(vec![], Collector::latest(variables))
    }
}

/// One collector reducing every input variable with the same statistic.
///
/// `sum` additionally accepts several inputs and a single output, in which case the
/// inputs are added together before accumulating (e.g. snowfall plus rainfall).
#[derive(Debug)]
pub struct StatisticFactory {
    statistic: Statistic,
}

impl StatisticFactory {
    pub fn new(statistic: Statistic) -> Self {
        Self { statistic }
    }

    /// A factory for each statistic
    pub fn all() -> Vec<Self> {
        [
            Statistic::Sum,
            Statistic::Mean,
            Statistic::Min,
            Statistic::Max,
            Statistic::Range,
        ]
        .into_iter()
        .map(Self::new)
        .collect()
    }
}

impl PipelineFactory for StatisticFactory {
    fn name(&self) -> &str {
        "StatisticFactory"
    }

    fn supports(&self, operator: &str) -> bool {
        operator == self.statistic.name()
    }

    fn build(&self, config: &OperatorConfig, _lookup: &LookupContext) -> GridAggResult<Pipeline> {
        let inputs = config.inputs.len();
        let outputs = config.outputs.len();

        let collector = match self.statistic {
            _ if inputs == 0 => return config.count_mismatch("at least one input"),
            Statistic::Sum if inputs > 1 && outputs == 1 => Collector::reduced_sum(inputs),
            _ if inputs != outputs => return config.count_mismatch("one output per input"),
            statistic => Collector::for_statistic(statistic, inputs),
        };
        Pipeline::single_collector(vec![], collector)
    }
}

/// `difference`: mean of `a - b` for exactly two inputs and one output
#[derive(Debug, Default)]
pub struct DifferenceFactory;

impl PipelineFactory for DifferenceFactory {
    fn name(&self) -> &str {
        "DifferenceFactory"
    }

    fn supports(&self, operator: &str) -> bool {
        operator == "difference"
    }

    fn build(&self, config: &OperatorConfig, _lookup: &LookupContext) -> GridAggResult<Pipeline> {
        if config.inputs.len() != 2 || config.outputs.len() != 1 {
            return config.count_mismatch("two inputs and one output");
        }
        Pipeline::single_collector(vec![Transform::Difference.into()], Collector::mean(1))
    }
}

/// `speed`: statistics of the magnitude of a two component vector field.
///
/// Each output takes its statistic from `statistics`, in order. A single output
/// without statistics is the mean speed.
#[derive(Debug, Default)]
pub struct SpeedFactory;

impl PipelineFactory for SpeedFactory {
    fn name(&self) -> &str {
        "SpeedFactory"
    }

    fn supports(&self, operator: &str) -> bool {
        operator == "speed"
    }

    fn build(&self, config: &OperatorConfig, _lookup: &LookupContext) -> GridAggResult<Pipeline> {
        if config.inputs.len() != 2 || config.outputs.is_empty() {
            return config.count_mismatch("two inputs and at least one output");
        }

        let statistics = match config.statistics.as_slice() {
            [] if config.outputs.len() == 1 => vec![Statistic::Mean],
            statistics if statistics.len() == config.outputs.len() => statistics.to_vec(),
            statistics => {
                return config.invalid(format!(
                    "{} statistics given for {} outputs",
                    statistics.len(),
                    config.outputs.len()
                ))
            }
        };

        let collectors = statistics
            .into_iter()
            .map(|statistic| Collector::for_statistic(statistic, 1))
            .collect();
        Pipeline::multi_collector(vec![Transform::Speed.into()], collectors)
    }
}
