use thiserror::Error;

/// Error type for invalid operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridAggError {
    #[error("No operator configured. The aggregator must be initialised before data is added")]
    NoOperatorConfigured,
    #[error("No pipeline factory supports operator type '{0}'")]
    UnknownOperator(String),
    #[error("Invalid configuration for operator '{operator}': {reason}")]
    InvalidConfiguration { operator: String, reason: String },
    #[error("Operator '{operator}' expects {expected}, got {inputs} input(s) and {outputs} output(s)")]
    VariableCountMismatch {
        operator: String,
        expected: String,
        inputs: usize,
        outputs: usize,
    },
    #[error("Unknown comparison '{0}'. Expected 'greater' or 'less'")]
    UnknownComparison(String),
    #[error("No lookup table is bound to '{bind}'")]
    MissingLookup { bind: String },
    #[error("Lookup table '{bind}' is not a {expected} table")]
    LookupTypeMismatch { bind: String, expected: String },
    #[error("Zone '{zone}' has no threshold in lookup table '{bind}'")]
    MissingZoneThreshold { zone: String, bind: String },
    #[error("Array length mismatch in {stage}. Expected {expected} cells, got {got}")]
    ShapeMismatch {
        stage: String,
        expected: usize,
        got: usize,
    },
    #[error("{stage} expects {expected} input variable(s), got {got}")]
    ArityMismatch {
        stage: String,
        expected: usize,
        got: usize,
    },
    #[error("Invalid pipeline: {0}")]
    InvalidPipeline(String),
    #[error("Invalid season definition: {0}")]
    InvalidSeason(String),
    #[error("Invalid time units '{0}'. Expected 'days since <date>[ <time>]'")]
    InvalidTimeUnits(String),
    #[error("Calendar conversion failed: {0}")]
    CalendarConversion(String),
    #[error("Could not parse configuration: {0}")]
    ConfigParse(String),
}

/// Convenience type for `Result<T, GridAggError>`.
pub type GridAggResult<T> = Result<T, GridAggError>;
