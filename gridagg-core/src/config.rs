//! Run configuration.
//!
//! ```toml
//! [bucketing]
//! period = "MonthlyBucketing"
//! calendar = { epoch = "1970-01-01T00:00:00", zone = "UTC" }
//!
//! [operator]
//! operator = "threshold_count"
//! inputs = ["tas"]
//! outputs = ["tas_exceedance"]
//! window = 24
//! threshold = { global = 303.15 }
//! ```

use crate::bucketing::TimeBucketing;
use crate::errors::{GridAggError, GridAggResult};
use crate::pipeline::{Comparison, Statistic};
use crate::time::FloatValue;
use serde::{Deserialize, Serialize};

fn default_window() -> usize {
    1
}

fn default_comparison() -> String {
    Comparison::default().to_string()
}

/// Threshold of an exceedance operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdConfig {
    /// One threshold for every cell
    Global(FloatValue),
    /// Thresholds per zone, resolved through two lookup tables
    Zonal {
        /// Bind name of the cell to zone table
        zones: String,
        /// Bind name of the zone to threshold table
        thresholds: String,
    },
}

/// What to compute and over which variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Operator identifier, e.g. `"mean"` or `"threshold_count"`
    pub operator: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    /// Number of slices averaged before an exceedance is accumulated
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default)]
    pub threshold: Option<ThresholdConfig>,
    /// `"greater"` or `"less"`
    #[serde(default = "default_comparison")]
    pub comparison: String,
    /// Statistic per output for operators with several collectors
    #[serde(default)]
    pub statistics: Vec<Statistic>,
}

impl OperatorConfig {
    pub fn new(operator: impl Into<String>, inputs: &[&str], outputs: &[&str]) -> Self {
        Self {
            operator: operator.into(),
            inputs: inputs.iter().map(|name| name.to_string()).collect(),
            outputs: outputs.iter().map(|name| name.to_string()).collect(),
            window: default_window(),
            threshold: None,
            comparison: default_comparison(),
            statistics: vec![],
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_threshold(mut self, threshold: ThresholdConfig) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_comparison(mut self, comparison: impl Into<String>) -> Self {
        self.comparison = comparison.into();
        self
    }

    pub fn with_statistics(mut self, statistics: Vec<Statistic>) -> Self {
        self.statistics = statistics;
        self
    }

    /// Parse the configured comparison direction
    pub fn comparison(&self) -> GridAggResult<Comparison> {
        self.comparison.parse()
    }

    /// Fail with a [`GridAggError::InvalidConfiguration`] for this operator
    pub fn invalid<T>(&self, reason: impl Into<String>) -> GridAggResult<T> {
        Err(GridAggError::InvalidConfiguration {
            operator: self.operator.clone(),
            reason: reason.into(),
        })
    }

    /// Fail with a [`GridAggError::VariableCountMismatch`] for this operator
    pub fn count_mismatch<T>(&self, expected: impl Into<String>) -> GridAggResult<T> {
        Err(GridAggError::VariableCountMismatch {
            operator: self.operator.clone(),
            expected: expected.into(),
            inputs: self.inputs.len(),
            outputs: self.outputs.len(),
        })
    }
}

/// A complete aggregation: the period and the operator applied within it
#[derive(Debug, Serialize, Deserialize)]
pub struct AggregationConfig {
    pub bucketing: Box<dyn TimeBucketing>,
    pub operator: OperatorConfig,
}

impl AggregationConfig {
    pub fn new(bucketing: Box<dyn TimeBucketing>, operator: OperatorConfig) -> Self {
        Self {
            bucketing,
            operator,
        }
    }

    pub fn from_toml(source: &str) -> GridAggResult<Self> {
        toml::from_str(source).map_err(|err| GridAggError::ConfigParse(err.to_string()))
    }

    pub fn to_toml(&self) -> GridAggResult<String> {
        toml::to_string(self).map_err(|err| GridAggError::ConfigParse(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucketing::{MonthlyBucketing, Season, SeasonalBucketing};
    use crate::time::Calendar;

    #[test]
    fn operator_defaults() {
        let config: OperatorConfig = toml::from_str(
            r#"
operator = "mean"
inputs = ["tas"]
outputs = ["tas_mean"]
"#,
        )
        .unwrap();

        assert_eq!(config, OperatorConfig::new("mean", &["tas"], &["tas_mean"]));
        assert_eq!(config.window, 1);
        assert_eq!(config.comparison(), Ok(Comparison::Greater));
        assert!(config.threshold.is_none());
    }

    #[test]
    fn parses_thresholds() {
        let config: OperatorConfig = toml::from_str(
            r#"
operator = "threshold_value"
inputs = ["pr"]
outputs = ["pr_exceedance"]
window = 24
comparison = "less"
threshold = { zonal = { zones = "cell_zone", thresholds = "zone_threshold" } }
"#,
        )
        .unwrap();

        assert_eq!(config.window, 24);
        assert_eq!(config.comparison(), Ok(Comparison::Less));
        assert_eq!(
            config.threshold,
            Some(ThresholdConfig::Zonal {
                zones: "cell_zone".to_string(),
                thresholds: "zone_threshold".to_string()
            })
        );

        let global: OperatorConfig = toml::from_str(
            r#"
operator = "threshold_count"
inputs = ["tas"]
outputs = ["hot_days"]
threshold = { global = 303.15 }
"#,
        )
        .unwrap();
        assert_eq!(global.threshold, Some(ThresholdConfig::Global(303.15)));
    }

    #[test]
    fn invalid_comparison() {
        let config = OperatorConfig::new("threshold_count", &["tas"], &["n"]).with_comparison("equal");
        assert_eq!(
            config.comparison(),
            Err(GridAggError::UnknownComparison("equal".to_string()))
        );
    }

    #[test]
    fn seasonal_config() {
        let config = AggregationConfig::from_toml(
            r#"
[bucketing]
period = "SeasonalBucketing"
calendar = { epoch = "1970-01-01T00:00:00", zone = "UTC" }
seasons = [{ name = "wet", start = "11-01" }, { name = "dry", start = "05-01" }]

[operator]
operator = "speed"
inputs = ["uas", "vas"]
outputs = ["wind_mean", "wind_max"]
statistics = ["mean", "max"]
"#,
        )
        .unwrap();

        assert_eq!(config.bucketing.descriptor(), "seasonal");
        assert_eq!(config.operator.statistics, vec![Statistic::Mean, Statistic::Max]);
    }

    #[test]
    fn round_trip() {
        let calendar = Calendar::from_units("days since 1970-01-01", chrono_tz::UTC).unwrap();
        let config = AggregationConfig::new(
            Box::new(MonthlyBucketing::new(calendar.clone())),
            OperatorConfig::new("max", &["tasmax"], &["tasmax_max"]),
        );
        let serialised = config.to_toml().unwrap();
        let restored = AggregationConfig::from_toml(&serialised).unwrap();
        assert_eq!(restored.bucketing.descriptor(), "monthly");
        assert_eq!(restored.operator, config.operator);

        let seasonal = AggregationConfig::new(
            Box::new(
                SeasonalBucketing::new(calendar, vec![Season::new("all year", "01-01")]).unwrap(),
            ),
            OperatorConfig::new("mean", &["tas"], &["tas_mean"]),
        );
        let restored = AggregationConfig::from_toml(&seasonal.to_toml().unwrap()).unwrap();
        assert_eq!(restored.bucketing.descriptor(), "seasonal");
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            AggregationConfig::from_toml("[operator]\noperator = 1"),
            Err(GridAggError::ConfigParse(_))
        ));
        assert!(matches!(
            AggregationConfig::from_toml(
                "[bucketing]\nperiod = \"WeeklyBucketing\"\n[operator]\noperator = \"mean\"\ninputs = []\noutputs = []"
            ),
            Err(GridAggError::ConfigParse(_))
        ));
    }
}
