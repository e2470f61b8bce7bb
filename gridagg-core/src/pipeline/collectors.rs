//! Collectors: terminal stages holding a running per-cell aggregate.
//!
//! Accumulators are sized on the first slice a collector sees. Until then (and after
//! a reset) a collector reports one empty array per output variable.

use super::reduce::{check_slice, ensure_accumulators, nan_add, nan_max, nan_min};
use super::CellArray;
use crate::errors::GridAggResult;
use crate::time::FloatValue;
use ndarray::Zip;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-cell statistic reduced over a period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Sum,
    Mean,
    Min,
    Max,
    Range,
}

impl Statistic {
    /// Operator identifier for this statistic
    pub fn name(&self) -> &'static str {
        match self {
            Statistic::Sum => "sum",
            Statistic::Mean => "mean",
            Statistic::Min => "min",
            Statistic::Max => "max",
            Statistic::Range => "range",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn empty_results(outputs: usize) -> Vec<CellArray> {
    vec![CellArray::zeros(0); outputs]
}

/// Running per-cell total.
///
/// A cell that is missing in every slice stays missing rather than summing to zero.
#[derive(Debug, Clone)]
pub struct SumCollector {
    inputs: usize,
    outputs: usize,
    totals: Vec<CellArray>,
}

impl SumCollector {
    pub fn new(variables: usize) -> Self {
        Self {
            inputs: variables,
            outputs: variables,
            totals: vec![],
        }
    }

    /// Sum every input variable of a slice into a single output before accumulating.
    pub fn reduced(inputs: usize) -> Self {
        Self {
            inputs,
            outputs: 1,
            totals: vec![],
        }
    }

    pub fn is_reduced(&self) -> bool {
        self.inputs > self.outputs
    }

    fn update(&mut self, slice: &[CellArray]) -> GridAggResult<()> {
        let cells = check_slice("Sum", slice, self.inputs)?;
        ensure_accumulators("Sum", &mut self.totals, self.outputs, cells, FloatValue::NAN)?;

        if self.is_reduced() {
            let mut combined = CellArray::from_elem(cells, FloatValue::NAN);
            for values in slice {
                Zip::from(&mut combined)
                    .and(values)
                    .for_each(|acc, &value| *acc = nan_add(*acc, value));
            }
            Zip::from(&mut self.totals[0])
                .and(&combined)
                .for_each(|total, &value| *total = nan_add(*total, value));
        } else {
            for (total, values) in self.totals.iter_mut().zip(slice) {
                Zip::from(total)
                    .and(values)
                    .for_each(|total, &value| *total = nan_add(*total, value));
            }
        }
        Ok(())
    }

    fn results(&self) -> Vec<CellArray> {
        if self.totals.is_empty() {
            return empty_results(self.outputs);
        }
        self.totals.clone()
    }

    fn reset(&mut self) {
        self.totals.clear();
    }
}

/// Running per-cell mean of present values.
///
/// Missing values are excluded from both the sum and the count.
#[derive(Debug, Clone)]
pub struct MeanCollector {
    variables: usize,
    sums: Vec<CellArray>,
    counts: Vec<CellArray>,
}

impl MeanCollector {
    pub fn new(variables: usize) -> Self {
        Self {
            variables,
            sums: vec![],
            counts: vec![],
        }
    }

    fn update(&mut self, slice: &[CellArray]) -> GridAggResult<()> {
        let cells = check_slice("Mean", slice, self.variables)?;
        ensure_accumulators("Mean", &mut self.sums, self.variables, cells, 0.0)?;
        ensure_accumulators("Mean", &mut self.counts, self.variables, cells, 0.0)?;

        for ((sum, count), values) in self.sums.iter_mut().zip(&mut self.counts).zip(slice) {
            Zip::from(sum)
                .and(count)
                .and(values)
                .for_each(|sum, count, &value| {
                    if !value.is_nan() {
                        *sum += value;
                        *count += 1.0;
                    }
                });
        }
        Ok(())
    }

    fn results(&self) -> Vec<CellArray> {
        if self.sums.is_empty() {
            return empty_results(self.variables);
        }
        self.sums
            .iter()
            .zip(&self.counts)
            .map(|(sum, count)| {
                Zip::from(sum).and(count).map_collect(|&sum, &count| {
                    if count > 0.0 {
                        sum / count
                    } else {
                        FloatValue::NAN
                    }
                })
            })
            .collect()
    }

    fn reset(&mut self) {
        self.sums.clear();
        self.counts.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extremum {
    Min,
    Max,
}

/// Running per-cell minimum or maximum ignoring missing values
#[derive(Debug, Clone)]
pub struct ExtremumCollector {
    variables: usize,
    extremum: Extremum,
    values: Vec<CellArray>,
}

impl ExtremumCollector {
    pub fn new(variables: usize, extremum: Extremum) -> Self {
        Self {
            variables,
            extremum,
            values: vec![],
        }
    }

    fn name(&self) -> &'static str {
        match self.extremum {
            Extremum::Min => "Min",
            Extremum::Max => "Max",
        }
    }

    fn update(&mut self, slice: &[CellArray]) -> GridAggResult<()> {
        let stage = self.name();
        let cells = check_slice(stage, slice, self.variables)?;
        ensure_accumulators(stage, &mut self.values, self.variables, cells, FloatValue::NAN)?;

        let fold: fn(FloatValue, FloatValue) -> FloatValue = match self.extremum {
            Extremum::Min => nan_min,
            Extremum::Max => nan_max,
        };
        for (acc, values) in self.values.iter_mut().zip(slice) {
            Zip::from(acc)
                .and(values)
                .for_each(|acc, &value| *acc = fold(*acc, value));
        }
        Ok(())
    }

    fn results(&self) -> Vec<CellArray> {
        if self.values.is_empty() {
            return empty_results(self.variables);
        }
        self.values.clone()
    }

    fn reset(&mut self) {
        self.values.clear();
    }
}

/// Per-cell spread between the running maximum and minimum
#[derive(Debug, Clone)]
pub struct RangeCollector {
    minima: ExtremumCollector,
    maxima: ExtremumCollector,
}

impl RangeCollector {
    pub fn new(variables: usize) -> Self {
        Self {
            minima: ExtremumCollector::new(variables, Extremum::Min),
            maxima: ExtremumCollector::new(variables, Extremum::Max),
        }
    }

    fn update(&mut self, slice: &[CellArray]) -> GridAggResult<()> {
        self.minima.update(slice)?;
        self.maxima.update(slice)
    }

    fn results(&self) -> Vec<CellArray> {
        self.maxima
            .results()
            .iter()
            .zip(self.minima.results().iter())
            .map(|(max, min)| max - min)
            .collect()
    }

    fn reset(&mut self) {
        self.minima.reset();
        self.maxima.reset();
    }
}

/// Keeps the most recent slice without reducing it
#[derive(Debug, Clone)]
pub struct LatestCollector {
    variables: usize,
    latest: Vec<CellArray>,
}

impl LatestCollector {
    pub fn new(variables: usize) -> Self {
        Self {
            variables,
            latest: vec![],
        }
    }

    fn update(&mut self, slice: &[CellArray]) -> GridAggResult<()> {
        let cells = check_slice("Latest", slice, self.variables)?;
        ensure_accumulators("Latest", &mut self.latest, self.variables, cells, 0.0)?;
        self.latest.clone_from_slice(slice);
        Ok(())
    }

    fn results(&self) -> Vec<CellArray> {
        if self.latest.is_empty() {
            return empty_results(self.variables);
        }
        self.latest.clone()
    }

    fn reset(&mut self) {
        self.latest.clear();
    }
}

/// A terminal stage retaining per-cell state across slices
#[derive(Debug, Clone)]
pub enum Collector {
    Sum(SumCollector),
    Mean(MeanCollector),
    Min(ExtremumCollector),
    Max(ExtremumCollector),
    Range(RangeCollector),
    Latest(LatestCollector),
}

impl Collector {
    pub fn sum(variables: usize) -> Self {
        Collector::Sum(SumCollector::new(variables))
    }

    pub fn reduced_sum(inputs: usize) -> Self {
        Collector::Sum(SumCollector::reduced(inputs))
    }

    pub fn mean(variables: usize) -> Self {
        Collector::Mean(MeanCollector::new(variables))
    }

    pub fn min(variables: usize) -> Self {
        Collector::Min(ExtremumCollector::new(variables, Extremum::Min))
    }

    pub fn max(variables: usize) -> Self {
        Collector::Max(ExtremumCollector::new(variables, Extremum::Max))
    }

    pub fn range(variables: usize) -> Self {
        Collector::Range(RangeCollector::new(variables))
    }

    pub fn latest(variables: usize) -> Self {
        Collector::Latest(LatestCollector::new(variables))
    }

    pub fn for_statistic(statistic: Statistic, variables: usize) -> Self {
        match statistic {
            Statistic::Sum => Self::sum(variables),
            Statistic::Mean => Self::mean(variables),
            Statistic::Min => Self::min(variables),
            Statistic::Max => Self::max(variables),
            Statistic::Range => Self::range(variables),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Collector::Sum(_) => "Sum",
            Collector::Mean(_) => "Mean",
            Collector::Min(_) => "Min",
            Collector::Max(_) => "Max",
            Collector::Range(_) => "Range",
            Collector::Latest(_) => "Latest",
        }
    }

    /// Number of arrays produced by [`results`](Self::results)
    pub fn outputs(&self) -> usize {
        match self {
            Collector::Sum(c) => c.outputs,
            Collector::Mean(c) => c.variables,
            Collector::Min(c) | Collector::Max(c) => c.variables,
            Collector::Range(c) => c.minima.variables,
            Collector::Latest(c) => c.variables,
        }
    }

    pub fn update(&mut self, slice: &[CellArray]) -> GridAggResult<()> {
        match self {
            Collector::Sum(c) => c.update(slice),
            Collector::Mean(c) => c.update(slice),
            Collector::Min(c) | Collector::Max(c) => c.update(slice),
            Collector::Range(c) => c.update(slice),
            Collector::Latest(c) => c.update(slice),
        }
    }

    /// Snapshot of the current aggregate, one array per output variable
    pub fn results(&self) -> Vec<CellArray> {
        match self {
            Collector::Sum(c) => c.results(),
            Collector::Mean(c) => c.results(),
            Collector::Min(c) | Collector::Max(c) => c.results(),
            Collector::Range(c) => c.results(),
            Collector::Latest(c) => c.results(),
        }
    }

    /// Restore the state of a collector that has never executed
    pub fn reset(&mut self) {
        match self {
            Collector::Sum(c) => c.reset(),
            Collector::Mean(c) => c.reset(),
            Collector::Min(c) | Collector::Max(c) => c.reset(),
            Collector::Range(c) => c.reset(),
            Collector::Latest(c) => c.reset(),
        }
    }
}
