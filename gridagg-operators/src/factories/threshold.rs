//! Threshold exceedance operators.
//!
//! Every exceedance pipeline has the same shape:
//!
//! ```text
//! [Speed] -> Exceedance -> MeanWindow(window) -> Sum
//! ```
//!
//! The window averages `window` consecutive exceedances (e.g. the hourly slices of
//! a day) and the sum accumulates those averages over the aggregation period.
//! Speed is only inserted when two inputs (a vector field) feed a single output.

use gridagg_core::config::{OperatorConfig, ThresholdConfig};
use gridagg_core::errors::{GridAggError, GridAggResult};
use gridagg_core::lookup::LookupContext;
use gridagg_core::pipeline::{
    Collector, Exceedance, ExceedanceMeasure, MeanWindow, Pipeline, Stage, Threshold, Transform,
};
use gridagg_core::registry::PipelineFactory;
use log::debug;

/// Where an adaptor takes its threshold from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zoning {
    /// One global threshold
    Single,
    /// A threshold per zone, resolved per cell through lookup tables
    Multi,
}

impl Zoning {
    fn of(threshold: &ThresholdConfig) -> Self {
        match threshold {
            ThresholdConfig::Global(_) => Zoning::Single,
            ThresholdConfig::Zonal { .. } => Zoning::Multi,
        }
    }
}

/// Builds the pipeline for one exceedance measure and one kind of threshold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceedanceAdaptor {
    measure: ExceedanceMeasure,
    zoning: Zoning,
}

impl ExceedanceAdaptor {
    pub fn new(measure: ExceedanceMeasure, zoning: Zoning) -> Self {
        Self { measure, zoning }
    }

    /// Operator identifier handled by this adaptor
    pub fn operator(&self) -> &'static str {
        match self.measure {
            ExceedanceMeasure::Count => "threshold_count",
            ExceedanceMeasure::Value => "threshold_value",
            ExceedanceMeasure::ValueSquared => "threshold_value_squared",
        }
    }

    pub fn supports(&self, operator: &str, threshold: &ThresholdConfig) -> bool {
        self.operator() == operator && self.zoning == Zoning::of(threshold)
    }

    fn threshold(
        &self,
        config: &OperatorConfig,
        threshold: &ThresholdConfig,
        lookup: &LookupContext,
    ) -> GridAggResult<Threshold> {
        match (self.zoning, threshold) {
            (Zoning::Single, ThresholdConfig::Global(value)) => Ok(Threshold::Global(*value)),
            (Zoning::Multi, ThresholdConfig::Zonal { zones, thresholds }) => Ok(
                Threshold::PerCell(lookup.resolve_zonal_thresholds(zones, thresholds)?),
            ),
            _ => config.invalid(format!(
                "{:?} zoning cannot use threshold {:?}",
                self.zoning, threshold
            )),
        }
    }

    pub fn build(
        &self,
        config: &OperatorConfig,
        threshold: &ThresholdConfig,
        lookup: &LookupContext,
    ) -> GridAggResult<Pipeline> {
        let inputs = config.inputs.len();
        let outputs = config.outputs.len();
        let vector = inputs == 2 && outputs == 1;
        if inputs == 0 || (inputs != outputs && !vector) {
            return config.count_mismatch("one output per input, or two inputs and one output");
        }
        if config.window == 0 {
            return config.invalid("window must be at least 1");
        }

        let exceedance = Exceedance::new(
            self.measure,
            config.comparison()?,
            self.threshold(config, threshold, lookup)?,
        );

        let mut chain: Vec<Stage> = vec![];
        if vector {
            chain.push(Transform::Speed.into());
        }
        chain.push(Transform::Exceedance(exceedance).into());
        chain.push(MeanWindow::new(config.window)?.into());

        debug!(
            "{} with {:?} threshold over windows of {} slices",
            self.operator(),
            self.zoning,
            config.window
        );
        Pipeline::single_collector(chain, Collector::sum(outputs))
    }
}

/// Adaptors selected by operator identifier and threshold kind
#[derive(Debug, Clone)]
pub struct ExceedanceRegistry {
    adaptors: Vec<ExceedanceAdaptor>,
}

impl Default for ExceedanceRegistry {
    /// Count, value and squared value, each with global and zonal thresholds
    fn default() -> Self {
        let mut adaptors = vec![];
        for measure in [
            ExceedanceMeasure::Count,
            ExceedanceMeasure::Value,
            ExceedanceMeasure::ValueSquared,
        ] {
            for zoning in [Zoning::Single, Zoning::Multi] {
                adaptors.push(ExceedanceAdaptor::new(measure, zoning));
            }
        }
        Self { adaptors }
    }
}

impl ExceedanceRegistry {
    pub fn new(adaptors: Vec<ExceedanceAdaptor>) -> Self {
        Self { adaptors }
    }

    pub fn len(&self) -> usize {
        self.adaptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adaptors.is_empty()
    }

    /// Whether any adaptor handles `operator`
    pub fn handles(&self, operator: &str) -> bool {
        self.adaptors
            .iter()
            .any(|adaptor| adaptor.operator() == operator)
    }

    pub fn resolve(&self, operator: &str, threshold: &ThresholdConfig) -> Option<&ExceedanceAdaptor> {
        self.adaptors
            .iter()
            .find(|adaptor| adaptor.supports(operator, threshold))
    }
}

/// `threshold_count`, `threshold_value` and `threshold_value_squared`
#[derive(Debug, Default)]
pub struct ThresholdFactory {
    adaptors: ExceedanceRegistry,
}

impl ThresholdFactory {
    pub fn new(adaptors: ExceedanceRegistry) -> Self {
        Self { adaptors }
    }
}

impl PipelineFactory for ThresholdFactory {
    fn name(&self) -> &str {
        "ThresholdFactory"
    }

    fn supports(&self, operator: &str) -> bool {
        self.adaptors.handles(operator)
    }

    fn build(&self, config: &OperatorConfig, lookup: &LookupContext) -> GridAggResult<Pipeline> {
        let Some(threshold) = &config.threshold else {
            return config.invalid("a threshold is required");
        };
        let adaptor = self
            .adaptors
            .resolve(&config.operator, threshold)
            .ok_or_else(|| GridAggError::UnknownOperator(config.operator.clone()))?;
        adaptor.build(config, threshold, lookup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridagg_core::lookup::LookupTable;
    use ndarray::array;
    use std::collections::HashMap;

    fn global(operator: &str, threshold: f64) -> OperatorConfig {
        OperatorConfig::new(operator, &["tas"], &["tas_exceedance"])
            .with_threshold(ThresholdConfig::Global(threshold))
    }

    fn build(config: &OperatorConfig) -> GridAggResult<Pipeline> {
        ThresholdFactory::default().build(config, &LookupContext::new())
    }

    #[test]
    fn six_adaptors() {
        let registry = ExceedanceRegistry::default();
        assert_eq!(registry.len(), 6);
        let zonal = ThresholdConfig::Zonal {
            zones: "z".to_string(),
            thresholds: "t".to_string(),
        };
        assert_eq!(
            registry.resolve("threshold_value", &zonal),
            Some(&ExceedanceAdaptor::new(ExceedanceMeasure::Value, Zoning::Multi))
        );
        assert!(registry.resolve("threshold_mean", &zonal).is_none());
    }

    #[test]
    fn windowed_count() {
        let config = global("threshold_count", 5.0).with_window(2);
        let mut pipeline = build(&config).unwrap();
        pipeline.execute(&[array![6.0]]).unwrap();
        pipeline.execute(&[array![4.0]]).unwrap();
        assert_eq!(pipeline.results(), vec![array![0.5]]);

        pipeline.execute(&[array![7.0]]).unwrap();
        pipeline.execute(&[array![8.0]]).unwrap();
        assert_eq!(pipeline.results(), vec![array![1.5]]);
    }

    #[test]
    fn value_and_squared_value() {
        let mut value = build(&global("threshold_value", 5.0)).unwrap();
        let mut squared = build(&global("threshold_value_squared", 5.0)).unwrap();
        for slice in [array![6.0, 1.0], array![4.0, 7.0]] {
            value.execute(&[slice.clone()]).unwrap();
            squared.execute(&[slice]).unwrap();
        }
        assert_eq!(value.results(), vec![array![6.0, 7.0]]);
        assert_eq!(squared.results(), vec![array![36.0, 49.0]]);
    }

    #[test]
    fn less_than_comparison() {
        let config = global("threshold_count", 0.0).with_comparison("less");
        let mut pipeline = build(&config).unwrap();
        pipeline.execute(&[array![-1.0, 1.0]]).unwrap();
        assert_eq!(pipeline.results(), vec![array![1.0, 0.0]]);

        let bad = global("threshold_count", 0.0).with_comparison("equal");
        assert!(matches!(
            build(&bad),
            Err(GridAggError::UnknownComparison(_))
        ));
    }

    #[test]
    fn vector_inputs_use_speed() {
        let config = OperatorConfig::new("threshold_count", &["uas", "vas"], &["windy"])
            .with_threshold(ThresholdConfig::Global(4.5));
        let mut pipeline = build(&config).unwrap();
        pipeline.execute(&[array![3.0, 1.0], array![4.0, 1.0]]).unwrap();
        assert_eq!(pipeline.results(), vec![array![1.0, 0.0]]);
        assert_eq!(pipeline.stage_count(), 4);
    }

    #[test]
    fn zonal_thresholds() {
        let lookup = LookupContext::new()
            .with_table(
                "cell_zone",
                LookupTable::CellZones(vec![Some("a".to_string()), Some("b".to_string()), None]),
            )
            .with_table(
                "zone_threshold",
                LookupTable::ZoneValues(HashMap::from([
                    ("a".to_string(), 1.0),
                    ("b".to_string(), 10.0),
                ])),
            );
        let config = OperatorConfig::new("threshold_count", &["pr"], &["wet"]).with_threshold(
            ThresholdConfig::Zonal {
                zones: "cell_zone".to_string(),
                thresholds: "zone_threshold".to_string(),
            },
        );

        let mut pipeline = ThresholdFactory::default().build(&config, &lookup).unwrap();
        pipeline.execute(&[array![5.0, 5.0, 5.0]]).unwrap();
        let results = pipeline.results();
        assert_eq!(results[0][0], 1.0);
        assert_eq!(results[0][1], 0.0);
        assert!(results[0][2].is_nan());

        assert!(matches!(
            ThresholdFactory::default().build(&config, &LookupContext::new()),
            Err(GridAggError::MissingLookup { .. })
        ));
    }

    #[test]
    fn configuration_errors() {
        let missing = OperatorConfig::new("threshold_count", &["tas"], &["n"]);
        assert!(matches!(
            build(&missing),
            Err(GridAggError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            build(&global("threshold_count", 1.0).with_window(0)),
            Err(GridAggError::InvalidConfiguration { .. })
        ));

        let counts = OperatorConfig::new("threshold_count", &["a", "b", "c"], &["n"])
            .with_threshold(ThresholdConfig::Global(1.0));
        assert!(matches!(
            build(&counts),
            Err(GridAggError::VariableCountMismatch { .. })
        ));
    }
}
