//! Error taxonomy for statistics aggregation and constraint evaluation
//!
//! Only configuration problems are errors. Division by zero is absorbed by
//! [`crate::numeric::safe_divide`], and a relative constraint without
//! comparable builds is a normal evaluation outcome.

use thiserror::Error;

/// Errors raised by the library
#[derive(Debug, Error)]
pub enum GateError {
    /// Missing report or endpoint, negative threshold, inverted timeframe, ...
    ///
    /// Aborts only the constraint being evaluated.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Percentile outside `[0, 100]`
    #[error("Configuration error: percentile must be in [0, 100], got {0}")]
    InvalidPercentile(f64),

    /// Endpoint inclusion pattern failed to compile
    #[error("Configuration error: invalid endpoint pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

impl GateError {
    /// Shorthand for [`GateError::Configuration`]
    pub fn config(message: impl Into<String>) -> Self {
        GateError::Configuration(message.into())
    }

    /// Whether this error belongs to the configuration class
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            GateError::Configuration(_)
                | GateError::InvalidPercentile(_)
                | GateError::InvalidPattern(_)
        )
    }
}

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_display() {
        let err = GateError::config("report 'a.jtl' not found");
        assert_eq!(
            err.to_string(),
            "Configuration error: report 'a.jtl' not found"
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn test_invalid_percentile_display() {
        let err = GateError::InvalidPercentile(101.0);
        assert!(err.to_string().contains("101"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_pattern_error_converts() {
        let err: GateError = regex::Regex::new("(").unwrap_err().into();
        assert!(matches!(err, GateError::InvalidPattern(_)));
    }
}
