//! Temporal aggregation of gridded model output.
//!
//! Slices of per-cell data are grouped into periods by a
//! [`TimeBucketing`](core::bucketing::TimeBucketing) strategy and reduced by a
//! [`Pipeline`](core::pipeline::Pipeline) built from an operator configuration.

pub use gridagg_core as core;
pub use gridagg_operators as operators;

pub mod prelude {
    pub use gridagg_core::aggregator::Aggregator;
    pub use gridagg_core::bucketing::{
        AllBucketing, AnnualBucketing, BucketedTimes, DailyBucketing, MonthlyBucketing,
        NoBucketing, Season, SeasonalBucketing, TimeBucketing,
    };
    pub use gridagg_core::config::{AggregationConfig, OperatorConfig, ThresholdConfig};
    pub use gridagg_core::errors::{GridAggError, GridAggResult};
    pub use gridagg_core::lookup::{LookupContext, LookupTable};
    pub use gridagg_core::pipeline::{CellArray, Statistic, TimeSlice};
    pub use gridagg_core::registry::PipelineRegistry;
    pub use gridagg_core::time::{Calendar, FloatValue, Time};
    pub use gridagg_operators::default_registry;
}
