//! Stateless transforms deriving new per-cell arrays from a slice.

use super::reduce::check_slice;
use super::{CellArray, TimeSlice};
use crate::errors::{GridAggError, GridAggResult};
use crate::time::FloatValue;
use ndarray::Zip;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of a threshold comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// `value > threshold`
    #[default]
    Greater,
    /// `value < threshold`
    Less,
}

impl Comparison {
    pub fn holds(&self, value: FloatValue, threshold: FloatValue) -> bool {
        match self {
            Comparison::Greater => value > threshold,
            Comparison::Less => value < threshold,
        }
    }
}

impl FromStr for Comparison {
    type Err = GridAggError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greater" => Ok(Comparison::Greater),
            "less" => Ok(Comparison::Less),
            other => Err(GridAggError::UnknownComparison(other.to_string())),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::Greater => write!(f, "greater"),
            Comparison::Less => write!(f, "less"),
        }
    }
}

/// What an exceeding value contributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceedanceMeasure {
    /// 1 per exceedance (frequency)
    Count,
    /// The exceeding value (intensity)
    Value,
    /// The square of the exceeding value
    ValueSquared,
}

impl ExceedanceMeasure {
    fn contribution(&self, value: FloatValue) -> FloatValue {
        match self {
            ExceedanceMeasure::Count => 1.0,
            ExceedanceMeasure::Value => value,
            ExceedanceMeasure::ValueSquared => value * value,
        }
    }
}

/// Threshold applied by an exceedance transform
#[derive(Debug, Clone, PartialEq)]
pub enum Threshold {
    /// One threshold for every cell
    Global(FloatValue),
    /// A threshold per cell, resolved from the cell's zone. NaN marks cells outside
    /// every zone.
    PerCell(CellArray),
}

/// Per-cell threshold test.
#[derive(Debug, Clone, PartialEq)]
pub struct Exceedance {
    pub measure: ExceedanceMeasure,
    pub comparison: Comparison,
    pub threshold: Threshold,
}

impl Exceedance {
    pub fn new(measure: ExceedanceMeasure, comparison: Comparison, threshold: Threshold) -> Self {
        Self {
            measure,
            comparison,
            threshold,
        }
    }

    fn evaluate(&self, value: FloatValue, threshold: FloatValue) -> FloatValue {
        if value.is_nan() || threshold.is_nan() {
            FloatValue::NAN
        } else if self.comparison.holds(value, threshold) {
            self.measure.contribution(value)
        } else {
            0.0
        }
    }

    fn apply(&self, values: &CellArray) -> GridAggResult<CellArray> {
        match &self.threshold {
            Threshold::Global(threshold) => Ok(values.mapv(|value| self.evaluate(value, *threshold))),
            Threshold::PerCell(thresholds) => {
                if thresholds.len() != values.len() {
                    return Err(GridAggError::ShapeMismatch {
                        stage: "Exceedance".to_string(),
                        expected: thresholds.len(),
                        got: values.len(),
                    });
                }
                Ok(Zip::from(values)
                    .and(thresholds)
                    .map_collect(|&value, &threshold| self.evaluate(value, threshold)))
            }
        }
    }
}

/// A stateless stage.
///
/// The derived slice is forwarded unchanged to every downstream stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    /// Forwards the slice as is
    Passthrough,
    /// Magnitude of a two component vector: `sqrt(u^2 + v^2)`
    Speed,
    /// `a - b` of two variables
    Difference,
    /// Threshold exceedance, applied to each variable independently
    Exceedance(Exceedance),
}

impl Transform {
    pub fn name(&self) -> &'static str {
        match self {
            Transform::Passthrough => "Passthrough",
            Transform::Speed => "Speed",
            Transform::Difference => "Difference",
            Transform::Exceedance(_) => "Exceedance",
        }
    }

    pub fn apply(&self, slice: &[CellArray]) -> GridAggResult<TimeSlice> {
        match self {
            Transform::Passthrough => Ok(slice.to_vec()),
            Transform::Speed => {
                check_slice(self.name(), slice, 2)?;
                Ok(vec![Zip::from(&slice[0])
                    .and(&slice[1])
                    .map_collect(|&u, &v| u.hypot(v))])
            }
            Transform::Difference => {
                check_slice(self.name(), slice, 2)?;
                Ok(vec![&slice[0] - &slice[1]])
            }
            Transform::Exceedance(exceedance) => {
                slice.iter().map(|values| exceedance.apply(values)).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const NAN: FloatValue = FloatValue::NAN;

    #[test]
    fn speed_is_vector_magnitude() {
        let result = Transform::Speed
            .apply(&[array![3.0, NAN, 0.0], array![4.0, 1.0, -2.0]])
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0][0], 5.0);
        assert!(result[0][1].is_nan());
        assert_eq!(result[0][2], 2.0);
    }

    #[test]
    fn speed_requires_two_components() {
        assert!(matches!(
            Transform::Speed.apply(&[array![3.0]]),
            Err(GridAggError::ArityMismatch { expected: 2, got: 1, .. })
        ));
    }

    #[test]
    fn difference() {
        let result = Transform::Difference
            .apply(&[array![5.0, 1.0], array![2.0, 3.0]])
            .unwrap();
        assert_eq!(result, vec![array![3.0, -2.0]]);
    }

    #[test]
    fn comparison_from_str() {
        assert_eq!("greater".parse::<Comparison>(), Ok(Comparison::Greater));
        assert_eq!("less".parse::<Comparison>(), Ok(Comparison::Less));
        assert_eq!(
            "equal".parse::<Comparison>(),
            Err(GridAggError::UnknownComparison("equal".to_string()))
        );
        assert_eq!(Comparison::default(), Comparison::Greater);
    }

    #[test]
    fn exceedance_measures() {
        let values = array![6.0, 4.0, NAN];
        let apply = |measure| {
            Transform::Exceedance(Exceedance::new(
                measure,
                Comparison::Greater,
                Threshold::Global(5.0),
            ))
            .apply(&[values.clone()])
            .unwrap()
            .remove(0)
        };

        let count = apply(ExceedanceMeasure::Count);
        assert_eq!(&count.as_slice().unwrap()[..2], &[1.0, 0.0]);
        assert!(count[2].is_nan());

        let value = apply(ExceedanceMeasure::Value);
        assert_eq!(&value.as_slice().unwrap()[..2], &[6.0, 0.0]);

        let squared = apply(ExceedanceMeasure::ValueSquared);
        assert_eq!(&squared.as_slice().unwrap()[..2], &[36.0, 0.0]);
    }

    #[test]
    fn exceedance_less_than() {
        let transform = Transform::Exceedance(Exceedance::new(
            ExceedanceMeasure::Count,
            Comparison::Less,
            Threshold::Global(0.0),
        ));
        let result = transform.apply(&[array![-1.0, 0.0, 1.0]]).unwrap();
        assert_eq!(result, vec![array![1.0, 0.0, 0.0]]);
    }

    #[test]
    fn per_cell_thresholds() {
        let transform = Transform::Exceedance(Exceedance::new(
            ExceedanceMeasure::Count,
            Comparison::Greater,
            Threshold::PerCell(array![1.0, 10.0, NAN]),
        ));
        let result = transform.apply(&[array![5.0, 5.0, 5.0]]).unwrap().remove(0);
        assert_eq!(result[0], 1.0);
        assert_eq!(result[1], 0.0);
        assert!(result[2].is_nan());

        assert!(transform.apply(&[array![5.0, 5.0]]).is_err());
    }
}
