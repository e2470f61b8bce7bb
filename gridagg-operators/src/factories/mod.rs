mod statistics;
mod threshold;

pub use statistics::{CachingFactory, DifferenceFactory, SpeedFactory, StatisticFactory};
pub use threshold::{ExceedanceAdaptor, ExceedanceRegistry, ThresholdFactory, Zoning};
