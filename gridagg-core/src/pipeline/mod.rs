//! Stage graph primitives.
//!
//! A [`Pipeline`] is a tree of [`Stage`]s stored in a `petgraph` arena. Slices enter
//! at the root and every produced slice is forwarded along the outgoing edges of the
//! stage that produced it. Collectors terminate the tree and hold the per-cell state
//! that makes up the results.

mod collectors;
mod graph;
mod reduce;
mod transforms;
mod window;

pub use collectors::{
    Collector, Extremum, ExtremumCollector, LatestCollector, MeanCollector, RangeCollector,
    Statistic, SumCollector,
};
pub use graph::{Pipeline, PipelineBuilder, StageGraph};
pub use transforms::{Comparison, Exceedance, ExceedanceMeasure, Threshold, Transform};
pub use window::MeanWindow;

use crate::errors::GridAggResult;
use crate::time::FloatValue;
use ndarray::Array1;

/// One value per spatial grid cell
pub type CellArray = Array1<FloatValue>;

/// The arrays of every input variable at a single raw timestamp
pub type TimeSlice = Vec<CellArray>;

/// A node in the stage graph
#[derive(Debug, Clone)]
pub enum Stage {
    Transform(Transform),
    Window(MeanWindow),
    Collect(Collector),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Transform(transform) => transform.name(),
            Stage::Window(_) => "MeanWindow",
            Stage::Collect(collector) => collector.name(),
        }
    }

    /// Consume a slice, returning the slice to forward downstream (if any)
    pub fn execute(&mut self, slice: &[CellArray]) -> GridAggResult<Option<TimeSlice>> {
        match self {
            Stage::Transform(transform) => transform.apply(slice).map(Some),
            Stage::Window(window) => window.push(slice),
            Stage::Collect(collector) => {
                collector.update(slice)?;
                Ok(None)
            }
        }
    }

    /// Clear numeric state. Transforms are stateless.
    pub fn reset(&mut self) {
        match self {
            Stage::Transform(_) => {}
            Stage::Window(window) => window.reset(),
            Stage::Collect(collector) => collector.reset(),
        }
    }

    pub fn as_collector(&self) -> Option<&Collector> {
        match self {
            Stage::Collect(collector) => Some(collector),
            _ => None,
        }
    }

    pub fn is_collector(&self) -> bool {
        self.as_collector().is_some()
    }
}

impl From<Transform> for Stage {
    fn from(value: Transform) -> Self {
        Stage::Transform(value)
    }
}

impl From<MeanWindow> for Stage {
    fn from(value: MeanWindow) -> Self {
        Stage::Window(value)
    }
}

impl From<Collector> for Stage {
    fn from(value: Collector) -> Self {
        Stage::Collect(value)
    }
}
