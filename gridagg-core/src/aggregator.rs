use crate::bucketing::{BucketedTimes, TimeBucketing};
use crate::config::{AggregationConfig, OperatorConfig};
use crate::errors::{GridAggError, GridAggResult};
use crate::lookup::LookupContext;
use crate::pipeline::{CellArray, Pipeline};
use crate::registry::PipelineRegistry;
use crate::time::Time;
use log::info;

#[derive(Debug)]
enum AggregatorState {
    Uninitialised,
    Initialised(Pipeline),
}

/// Reduces a stream of time slices over the periods of a bucketing strategy.
///
/// The caller drives the loop: it groups timestamps with
/// [`build_bucketing`](Aggregator::build_bucketing), adds every slice of a bucket,
/// reads the [`results`](Aggregator::results) and then calls
/// [`reset`](Aggregator::reset) before the next bucket.
///
/// ```rust
/// use gridagg_core::aggregator::Aggregator;
/// use gridagg_core::bucketing::DailyBucketing;
/// use gridagg_core::config::OperatorConfig;
/// use gridagg_core::errors::GridAggError;
/// use ndarray::array;
///
/// let mut aggregator = Aggregator::new(
///     Box::new(DailyBucketing::new()),
///     OperatorConfig::new("mean", &["tas"], &["tas_mean"]),
/// );
/// assert_eq!(aggregator.descriptor(), "daily mean");
///
/// // Data is rejected until a pipeline has been built
/// assert_eq!(
///     aggregator.add(0.0, &[array![1.0]]),
///     Err(GridAggError::NoOperatorConfigured)
/// );
/// ```
#[derive(Debug)]
pub struct Aggregator {
    bucketing: Box<dyn TimeBucketing>,
    config: OperatorConfig,
    state: AggregatorState,
}

impl Aggregator {
    pub fn new(bucketing: Box<dyn TimeBucketing>, config: OperatorConfig) -> Self {
        Self {
            bucketing,
            config,
            state: AggregatorState::Uninitialised,
        }
    }

    pub fn from_config(config: AggregationConfig) -> Self {
        Self::new(config.bucketing, config.operator)
    }

    pub fn config(&self) -> &OperatorConfig {
        &self.config
    }

    /// Build the pipeline for the configured operator.
    ///
    /// An existing pipeline is replaced.
    pub fn initialise(
        &mut self,
        registry: &PipelineRegistry,
        lookup: &LookupContext,
    ) -> GridAggResult<()> {
        let pipeline = registry.build(&self.config, lookup)?;
        info!(
            "Initialised {} aggregation of {:?} into {:?}",
            self.descriptor(),
            self.config.inputs,
            self.config.outputs
        );
        self.state = AggregatorState::Initialised(pipeline);
        Ok(())
    }

    pub fn is_initialised(&self) -> bool {
        matches!(self.state, AggregatorState::Initialised(_))
    }

    /// Discard the pipeline. The bucketing strategy and configuration are kept.
    pub fn un_initialise(&mut self) {
        if self.is_initialised() {
            info!("Discarding {} aggregation pipeline", self.descriptor());
        }
        self.state = AggregatorState::Uninitialised;
    }

    fn pipeline(&self) -> GridAggResult<&Pipeline> {
        match &self.state {
            AggregatorState::Initialised(pipeline) => Ok(pipeline),
            AggregatorState::Uninitialised => Err(GridAggError::NoOperatorConfigured),
        }
    }

    fn pipeline_mut(&mut self) -> GridAggResult<&mut Pipeline> {
        match &mut self.state {
            AggregatorState::Initialised(pipeline) => Ok(pipeline),
            AggregatorState::Uninitialised => Err(GridAggError::NoOperatorConfigured),
        }
    }

    /// Accumulate the slice recorded at `time`.
    ///
    /// The timestamp is not used by the reduction itself. Grouping slices into
    /// periods is the caller's responsibility.
    pub fn add(&mut self, _time: Time, slice: &[CellArray]) -> GridAggResult<()> {
        self.pipeline_mut()?.execute(slice)
    }

    /// One array per configured output, in output order
    pub fn results(&self) -> GridAggResult<Vec<CellArray>> {
        Ok(self.pipeline()?.results())
    }

    /// Clear accumulated state ahead of the next period
    pub fn reset(&mut self) -> GridAggResult<()> {
        self.pipeline_mut()?.reset();
        Ok(())
    }

    pub fn bucket_key(&mut self, time: Time) -> GridAggResult<Time> {
        self.bucketing.bucket_key(time)
    }

    pub fn build_bucketing(
        &mut self,
        times: &[Time],
        max_expected: usize,
    ) -> GridAggResult<BucketedTimes> {
        self.bucketing.build_bucketing(times, max_expected)
    }

    pub fn bucketing(&self) -> &dyn TimeBucketing {
        self.bucketing.as_ref()
    }

    /// Period and operator, e.g. `"monthly mean"`
    pub fn descriptor(&self) -> String {
        format!("{} {}", self.bucketing.descriptor(), self.config.operator)
    }
}
