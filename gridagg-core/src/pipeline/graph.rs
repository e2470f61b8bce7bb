use super::{CellArray, Collector, Stage, Transform};
use crate::errors::{GridAggError, GridAggResult};
use log::debug;
use petgraph::dot::{Config, Dot};
use petgraph::graph::NodeIndex;
use petgraph::visit::{Bfs, EdgeRef};
use petgraph::{Direction, Graph};

/// Stages as nodes, forwarding edges weighted by their order among a stage's outputs
pub type StageGraph = Graph<Stage, usize>;

/// A wired tree of stages with an ordered set of collectors.
///
/// The wiring is fixed once built. A pipeline is reused across aggregation periods
/// by calling [`reset`](Pipeline::reset) rather than by rebuilding it.
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: StageGraph,
    root: NodeIndex,
    collectors: Vec<NodeIndex>,
}

impl Pipeline {
    /// A linear chain of stages ending in a single collector
    pub fn single_collector(chain: Vec<Stage>, collector: Collector) -> GridAggResult<Self> {
        Self::multi_collector(chain, vec![collector])
    }

    /// A linear chain of stages whose final stage feeds every collector.
    ///
    /// Results are concatenated in the order the collectors are given.
    pub fn multi_collector(chain: Vec<Stage>, collectors: Vec<Collector>) -> GridAggResult<Self> {
        let mut builder = PipelineBuilder::new();

        let mut chain: Vec<NodeIndex> = chain
            .into_iter()
            .map(|stage| builder.add_stage(stage))
            .collect();
        if chain.is_empty() && collectors.len() > 1 {
            chain.push(builder.add_stage(Transform::Passthrough));
        }
        for pair in chain.windows(2) {
            builder.connect(pair[0], pair[1])?;
        }

        let mut root = chain.first().copied();
        for collector in collectors {
            let node = builder.add_stage(collector);
            match chain.last() {
                Some(last) => builder.connect(*last, node)?,
                None => root = Some(node),
            }
            builder.register_collector(node)?;
        }

        let root = root.ok_or_else(|| {
            GridAggError::InvalidPipeline("a pipeline needs at least one collector".to_string())
        })?;
        builder.build(root)
    }

    /// Push one slice through the graph starting at the root
    pub fn execute(&mut self, slice: &[CellArray]) -> GridAggResult<()> {
        self.forward(self.root, slice)
    }

    fn forward(&mut self, node: NodeIndex, slice: &[CellArray]) -> GridAggResult<()> {
        let Some(output) = self.stages[node].execute(slice)? else {
            return Ok(());
        };

        let mut downstream: Vec<(usize, NodeIndex)> = self
            .stages
            .edges(node)
            .map(|edge| (*edge.weight(), edge.target()))
            .collect();
        downstream.sort_unstable();

        for (_, next) in downstream {
            self.forward(next, &output)?;
        }
        Ok(())
    }

    /// Snapshot of every collector, concatenated in registration order
    pub fn results(&self) -> Vec<CellArray> {
        self.collectors()
            .flat_map(|collector| collector.results())
            .collect()
    }

    /// Return every stage to its never-executed state.
    ///
    /// Collectors are cleared and any partially filled [`MeanWindow`](super::MeanWindow)
    /// is dropped, so slices buffered before a reset never reach a collector.
    pub fn reset(&mut self) {
        for stage in self.stages.node_weights_mut() {
            stage.reset();
        }
    }

    /// Collectors in registration order
    pub fn collectors(&self) -> impl Iterator<Item = &Collector> + '_ {
        self.collectors
            .iter()
            .filter_map(|node| self.stages[*node].as_collector())
    }

    /// Total number of arrays produced by [`results`](Self::results)
    pub fn outputs(&self) -> usize {
        self.collectors().map(|collector| collector.outputs()).sum()
    }

    pub fn stage_count(&self) -> usize {
        self.stages.node_count()
    }

    /// Create a diagram of the stage graph.
    ///
    /// Useful for debugging.
    pub fn as_dot(&self) -> Dot<'_, &StageGraph> {
        Dot::with_attr_getters(
            &self.stages,
            &[Config::NodeNoLabel, Config::EdgeNoLabel],
            &|_, edge| format!("label = \"{}\"", edge.weight()),
            &|_, (_, stage)| format!("label = \"{}\"", stage.name()),
        )
    }
}

/// Incrementally wires a [`Pipeline`].
///
/// Edges may only fan out: a stage has at most one upstream stage and collectors
/// have none downstream.
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    stages: StageGraph,
    collectors: Vec<NodeIndex>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stage(&mut self, stage: impl Into<Stage>) -> NodeIndex {
        self.stages.add_node(stage.into())
    }

    fn stage(&self, node: NodeIndex) -> GridAggResult<&Stage> {
        self.stages.node_weight(node).ok_or_else(|| {
            GridAggError::InvalidPipeline(format!("stage {} does not exist", node.index()))
        })
    }

    /// Forward the output of `from` to `to`.
    ///
    /// Downstream stages receive slices in the order they were connected.
    pub fn connect(&mut self, from: NodeIndex, to: NodeIndex) -> GridAggResult<()> {
        let upstream = self.stage(from)?;
        self.stage(to)?;

        if from == to {
            return Err(GridAggError::InvalidPipeline(format!(
                "stage {} cannot feed itself",
                upstream.name()
            )));
        }
        if upstream.is_collector() {
            return Err(GridAggError::InvalidPipeline(format!(
                "collector {} cannot have downstream stages",
                upstream.name()
            )));
        }
        if self
            .stages
            .neighbors_directed(to, Direction::Incoming)
            .next()
            .is_some()
        {
            return Err(GridAggError::InvalidPipeline(format!(
                "stage {} already has an upstream stage",
                self.stages[to].name()
            )));
        }

        let order = self.stages.edges(from).count();
        self.stages.add_edge(from, to, order);
        Ok(())
    }

    /// Append a collector to the ordered results
    pub fn register_collector(&mut self, node: NodeIndex) -> GridAggResult<()> {
        let stage = self.stage(node)?;
        if !stage.is_collector() {
            return Err(GridAggError::InvalidPipeline(format!(
                "stage {} is not a collector",
                stage.name()
            )));
        }
        if self.collectors.contains(&node) {
            return Err(GridAggError::InvalidPipeline(format!(
                "collector {} is already registered",
                stage.name()
            )));
        }
        self.collectors.push(node);
        Ok(())
    }

    /// Validate the wiring and produce the pipeline.
    ///
    /// Every stage must be reachable from `root` and every collector registered.
    pub fn build(self, root: NodeIndex) -> GridAggResult<Pipeline> {
        self.stage(root)?;
        if self.collectors.is_empty() {
            return Err(GridAggError::InvalidPipeline(
                "a pipeline needs at least one collector".to_string(),
            ));
        }
        if self
            .stages
            .neighbors_directed(root, Direction::Incoming)
            .next()
            .is_some()
        {
            return Err(GridAggError::InvalidPipeline(
                "the root stage cannot have an upstream stage".to_string(),
            ));
        }

        let mut reached = 0;
        let mut bfs = Bfs::new(&self.stages, root);
        while bfs.next(&self.stages).is_some() {
            reached += 1;
        }
        if reached != self.stages.node_count() {
            return Err(GridAggError::InvalidPipeline(format!(
                "{} stages are not reachable from the root",
                self.stages.node_count() - reached
            )));
        }

        let collectors = self
            .stages
            .node_indices()
            .filter(|node| self.stages[*node].is_collector())
            .count();
        if collectors != self.collectors.len() {
            return Err(GridAggError::InvalidPipeline(format!(
                "{} collectors are not registered",
                collectors - self.collectors.len()
            )));
        }

        let pipeline = Pipeline {
            stages: self.stages,
            root,
            collectors: self.collectors,
        };
        debug!(
            "Built pipeline with {} stages and {} collectors",
            pipeline.stage_count(),
            pipeline.collectors.len()
        );
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Comparison, Exceedance, ExceedanceMeasure, MeanWindow, Threshold};
    use ndarray::array;

    #[test]
    fn single_collector_results() {
        let mut pipeline = Pipeline::single_collector(vec![], Collector::mean(1)).unwrap();
        pipeline.execute(&[array![1.0, 2.0]]).unwrap();
        pipeline.execute(&[array![3.0, 4.0]]).unwrap();
        assert_eq!(pipeline.results(), vec![array![2.0, 3.0]]);
        assert_eq!(pipeline.stage_count(), 1);
    }

    #[test]
    fn multi_collector_order() {
        let mut pipeline = Pipeline::multi_collector(
            vec![Transform::Speed.into()],
            vec![Collector::max(1), Collector::mean(1), Collector::min(1)],
        )
        .unwrap();
        assert_eq!(pipeline.outputs(), 3);

        pipeline.execute(&[array![3.0], array![4.0]]).unwrap();
        pipeline.execute(&[array![6.0], array![8.0]]).unwrap();
        assert_eq!(
            pipeline.results(),
            vec![array![10.0], array![7.5], array![5.0]]
        );
    }

    #[test]
    fn windowed_threshold_chain() {
        let mut pipeline = Pipeline::single_collector(
            vec![
                Transform::Exceedance(Exceedance::new(
                    ExceedanceMeasure::Count,
                    Comparison::Greater,
                    Threshold::Global(5.0),
                ))
                .into(),
                MeanWindow::new(2).unwrap().into(),
            ],
            Collector::sum(1),
        )
        .unwrap();

        pipeline.execute(&[array![6.0]]).unwrap();
        // Nothing reaches the collector until the window flushes
        assert_eq!(pipeline.results(), vec![CellArray::zeros(0)]);
        pipeline.execute(&[array![4.0]]).unwrap();
        assert_eq!(pipeline.results(), vec![array![0.5]]);
    }

    #[test]
    fn reset_clears_state_but_keeps_wiring() {
        let mut pipeline = Pipeline::multi_collector(
            vec![MeanWindow::new(2).unwrap().into()],
            vec![Collector::sum(1), Collector::max(1)],
        )
        .unwrap();
        pipeline.execute(&[array![1.0]]).unwrap();
        pipeline.execute(&[array![3.0]]).unwrap();
        pipeline.execute(&[array![100.0]]).unwrap();
        assert_eq!(pipeline.results(), vec![array![2.0], array![2.0]]);

        pipeline.reset();
        assert_eq!(pipeline.results(), vec![CellArray::zeros(0); 2]);
        assert_eq!(pipeline.stage_count(), 3);

        // The partial window from before the reset is gone
        pipeline.execute(&[array![5.0, 1.0]]).unwrap();
        pipeline.execute(&[array![7.0, 1.0]]).unwrap();
        assert_eq!(pipeline.results(), vec![array![6.0, 1.0], array![6.0, 1.0]]);
    }

    #[test]
    fn rejects_invalid_wiring() {
        let mut builder = PipelineBuilder::new();
        let a = builder.add_stage(Transform::Passthrough);
        let b = builder.add_stage(Transform::Passthrough);
        let c = builder.add_stage(Collector::sum(1));

        assert!(builder.connect(a, a).is_err());
        builder.connect(a, c).unwrap();
        // Fan-in
        assert!(builder.connect(b, c).is_err());
        // Out of a collector
        assert!(builder.connect(c, b).is_err());
        assert!(builder.register_collector(a).is_err());

        // b is unreachable and c is unregistered
        assert!(matches!(
            builder.build(a),
            Err(GridAggError::InvalidPipeline(_))
        ));
    }

    #[test]
    fn rejects_missing_collectors() {
        let mut builder = PipelineBuilder::new();
        let a = builder.add_stage(Transform::Passthrough);
        assert!(builder.build(a).is_err());

        assert!(Pipeline::multi_collector(vec![], vec![]).is_err());
    }

    #[test]
    fn explicit_fan_out() {
        let mut builder = PipelineBuilder::new();
        let root = builder.add_stage(Transform::Passthrough);
        let speed = builder.add_stage(Transform::Speed);
        let sum = builder.add_stage(Collector::sum(2));
        let mean = builder.add_stage(Collector::mean(1));
        builder.connect(root, sum).unwrap();
        builder.connect(root, speed).unwrap();
        builder.connect(speed, mean).unwrap();
        builder.register_collector(mean).unwrap();
        builder.register_collector(sum).unwrap();
        let mut pipeline = builder.build(root).unwrap();

        pipeline.execute(&[array![3.0], array![4.0]]).unwrap();
        assert_eq!(
            pipeline.results(),
            vec![array![5.0], array![3.0], array![4.0]]
        );
    }

    #[test]
    fn dot_lists_stages() {
        let pipeline = Pipeline::multi_collector(
            vec![Transform::Speed.into()],
            vec![Collector::mean(1), Collector::max(1)],
        )
        .unwrap();
        let dot = format!("{:?}", pipeline.as_dot());
        assert!(dot.contains("Speed"));
        assert!(dot.contains("Mean"));
        assert!(dot.contains("Max"));
    }
}
