//! NaN-aware per-cell folds shared by collectors and windows.
//!
//! NaN marks missing data. A missing value never replaces a present accumulator and
//! an accumulator that has only seen missing values stays NaN.

use super::CellArray;
use crate::errors::{GridAggError, GridAggResult};
use crate::time::FloatValue;
use num::Float;

pub(crate) fn nan_add<T: Float>(acc: T, value: T) -> T {
    if value.is_nan() {
        acc
    } else if acc.is_nan() {
        value
    } else {
        acc + value
    }
}

pub(crate) fn nan_min<T: Float>(acc: T, value: T) -> T {
    if value.is_nan() {
        acc
    } else if acc.is_nan() || value < acc {
        value
    } else {
        acc
    }
}

pub(crate) fn nan_max<T: Float>(acc: T, value: T) -> T {
    if value.is_nan() {
        acc
    } else if acc.is_nan() || value > acc {
        value
    } else {
        acc
    }
}

/// Check that a slice holds `expected` variables which all share one length.
///
/// Returns the number of cells.
pub(crate) fn check_slice(
    stage: &str,
    slice: &[CellArray],
    expected: usize,
) -> GridAggResult<usize> {
    if slice.len() != expected {
        return Err(GridAggError::ArityMismatch {
            stage: stage.to_string(),
            expected,
            got: slice.len(),
        });
    }

    let cells = slice.first().map(|values| values.len()).unwrap_or(0);
    for values in slice {
        if values.len() != cells {
            return Err(GridAggError::ShapeMismatch {
                stage: stage.to_string(),
                expected: cells,
                got: values.len(),
            });
        }
    }
    Ok(cells)
}

/// Lazily size per-variable accumulators on first use, then hold them to that size.
pub(crate) fn ensure_accumulators(
    stage: &str,
    accumulators: &mut Vec<CellArray>,
    variables: usize,
    cells: usize,
    fill: FloatValue,
) -> GridAggResult<()> {
    match accumulators.first() {
        None => {
            *accumulators = vec![CellArray::from_elem(cells, fill); variables];
            Ok(())
        }
        Some(existing) if existing.len() != cells => Err(GridAggError::ShapeMismatch {
            stage: stage.to_string(),
            expected: existing.len(),
            got: cells,
        }),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn folds_skip_missing() {
        let nan = FloatValue::NAN;
        assert_eq!(nan_add(nan, 2.0), 2.0);
        assert_eq!(nan_add(1.0, nan), 1.0);
        assert!(nan_add(nan, nan).is_nan());

        assert_eq!(nan_min(3.0, 1.0), 1.0);
        assert_eq!(nan_min(nan, 1.0), 1.0);
        assert_eq!(nan_min(1.0, nan), 1.0);
        assert_eq!(nan_max(3.0, 1.0), 3.0);
        assert!(nan_max(nan, nan).is_nan());
    }

    #[test]
    fn slice_checks() {
        let slice = vec![array![1.0, 2.0], array![3.0, 4.0]];
        assert_eq!(check_slice("Test", &slice, 2), Ok(2));
        assert!(matches!(
            check_slice("Test", &slice, 1),
            Err(GridAggError::ArityMismatch { expected: 1, got: 2, .. })
        ));

        let ragged = vec![array![1.0, 2.0], array![3.0]];
        assert!(matches!(
            check_slice("Test", &ragged, 2),
            Err(GridAggError::ShapeMismatch { expected: 2, got: 1, .. })
        ));
    }

    #[test]
    fn accumulators_hold_their_size() {
        let mut accumulators = vec![];
        ensure_accumulators("Test", &mut accumulators, 2, 3, 0.0).unwrap();
        assert_eq!(accumulators, vec![array![0.0, 0.0, 0.0]; 2]);
        assert!(ensure_accumulators("Test", &mut accumulators, 2, 3, 0.0).is_ok());
        assert!(ensure_accumulators("Test", &mut accumulators, 2, 4, 0.0).is_err());
    }
}
