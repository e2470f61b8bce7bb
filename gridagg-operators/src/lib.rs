//! Pipeline factories for the standard aggregation operators
//!
//! | Operator | Pipeline |
//! |---|---|
//! | `none` | latest slice of every input |
//! | `sum`, `mean`, `min`, `max`, `range` | one collector over every input |
//! | `speed` | vector magnitude feeding one collector per output |
//! | `difference` | `a - b` feeding a mean |
//! | `threshold_count`, `threshold_value`, `threshold_value_squared` | exceedance, windowed mean then sum |
//!
//! Use [`default_registry`] to resolve any of these by identifier.

pub mod factories;

use factories::{CachingFactory, DifferenceFactory, SpeedFactory, StatisticFactory, ThresholdFactory};
use gridagg_core::registry::PipelineRegistry;

/// A registry holding a factory for every standard operator
pub fn default_registry() -> PipelineRegistry {
    let mut registry = PipelineRegistry::new().with_factory(CachingFactory);
    for factory in StatisticFactory::all() {
        registry.register(Box::new(factory));
    }
    registry
        .with_factory(SpeedFactory)
        .with_factory(DifferenceFactory)
        .with_factory(ThresholdFactory::default())
}
