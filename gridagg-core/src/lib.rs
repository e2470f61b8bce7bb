pub mod aggregator;
pub mod bucketing;
pub mod config;
pub mod errors;
pub mod lookup;
pub mod pipeline;
pub mod registry;
pub mod time;
