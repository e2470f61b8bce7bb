use super::reduce::{check_slice, ensure_accumulators};
use super::{CellArray, TimeSlice};
use crate::errors::{GridAggError, GridAggResult};
use crate::time::FloatValue;
use ndarray::Zip;

/// Averages every `size` consecutive slices and forwards the mean.
///
/// Missing values are left out of the per-cell mean. A cell that is missing for a
/// whole window is forwarded as NaN. A partially filled window is held until the
/// next flush or discarded by [`reset`](MeanWindow::reset).
#[derive(Debug, Clone)]
pub struct MeanWindow {
    size: usize,
    count: usize,
    sums: Vec<CellArray>,
    counts: Vec<CellArray>,
}

impl MeanWindow {
    pub fn new(size: usize) -> GridAggResult<Self> {
        if size == 0 {
            return Err(GridAggError::InvalidPipeline(
                "window size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            size,
            count: 0,
            sums: vec![],
            counts: vec![],
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of slices buffered towards the next flush
    pub fn pending(&self) -> usize {
        self.count
    }

    pub fn push(&mut self, slice: &[CellArray]) -> GridAggResult<Option<TimeSlice>> {
        let variables = if self.sums.is_empty() {
            slice.len()
        } else {
            self.sums.len()
        };
        let cells = check_slice("MeanWindow", slice, variables)?;
        ensure_accumulators("MeanWindow", &mut self.sums, variables, cells, 0.0)?;
        ensure_accumulators("MeanWindow", &mut self.counts, variables, cells, 0.0)?;

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
        self.count += 1;

        if self.count < self.size {
            return Ok(None);
        }

        let means = self
            .sums
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
            .collect();
        self.restart();
        Ok(Some(means))
    }

    fn restart(&mut self) {
        self.count = 0;
        self.sums.iter_mut().for_each(|sum| sum.fill(0.0));
        self.counts.iter_mut().for_each(|count| count.fill(0.0));
    }

    /// Drop any partially filled window and forget the grid size
    pub fn reset(&mut self) {
        self.count = 0;
        self.sums.clear();
        self.counts.clear();
    }
}
