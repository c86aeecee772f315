use thiserror::Error;

/// Failures reported by a metrics source. The scan treats every variant as
/// "ticker unavailable" and moves on.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("No usable data for {0}")]
    Unavailable(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Weights must sum to 1.0 (got {0:.4})")]
    WeightsSum(f64),

    #[error("Weight '{0}' must be non-negative")]
    NegativeWeight(&'static str),

    #[error("Threshold '{0}' must be positive")]
    InvalidThreshold(&'static str),

    #[error("'{0}' must be a finite number")]
    NonFinite(&'static str),
}
