//! Domain-specific error types for layercake-groups
//!
//! # Error Categories
//!
//! - **AggregationError**: aggregation engine configuration errors
//! - **GraphError**: group membership, node and aggregation row errors
//! - **FormatError**: display format codes that cannot be decoded
//!
//! Data-shape problems (a missing attribute, a value that is not a number)
//! are never errors: the engine skips the offending node for that spec.
//!
//! # Examples
//!
//! ```rust
//! use layercake_groups::errors::{AggregationError, GraphError};
//!
//! let err = AggregationError::InvalidAggregateFunction("median".to_string());
//! assert!(err.is_configuration_error());
//!
//! let err = GraphError::GroupNotFound("region_north".to_string());
//! assert!(err.is_not_found());
//! ```

pub mod aggregation;
pub mod format;
pub mod graph;

pub use aggregation::AggregationError;
pub use format::FormatError;
pub use graph::GraphError;

/// Result type alias for aggregation engine operations
pub type AggregationResult<T> = Result<T, AggregationError>;

/// Result type alias for graph and group state operations
pub type GraphResult<T> = Result<T, GraphError>;
