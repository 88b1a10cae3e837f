//! Aggregation engine error types
//!
//! Only configuration mismatches surface here. Missing or non-numeric
//! attribute values are skipped by the engine.

use thiserror::Error;

/// Aggregation engine errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    /// Aggregate function name outside `sum|min|max|avg`
    #[error("Invalid aggregate function: {0}")]
    InvalidAggregateFunction(String),
}

impl AggregationError {
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, AggregationError::InvalidAggregateFunction(_))
    }

    /// Get error code for reports and logs
    pub fn error_code(&self) -> &'static str {
        match self {
            AggregationError::InvalidAggregateFunction(_) => "INVALID_AGGREGATE_FUNCTION",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_aggregate_function() {
        let err = AggregationError::InvalidAggregateFunction("median".to_string());
        assert_eq!(err.to_string(), "Invalid aggregate function: median");
        assert!(err.is_configuration_error());
        assert_eq!(err.error_code(), "INVALID_AGGREGATE_FUNCTION");
    }
}
