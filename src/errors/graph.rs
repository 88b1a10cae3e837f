//! Graph-related error types
//!
//! Structured errors for group membership edits and aggregation row edits.
//!
//! # Examples
//!
//! ```rust
//! use layercake_groups::errors::GraphError;
//!
//! let err = GraphError::NodeNotFound("n1".to_string());
//! assert_eq!(err.error_code(), "NOT_FOUND");
//!
//! let err = GraphError::AggregationIndexOutOfRange {
//!     group: "g1".to_string(),
//!     index: 3,
//!     len: 1,
//! };
//! assert!(err.is_client_error());
//! ```

use thiserror::Error;

use super::AggregationError;

/// Graph-related errors
#[derive(Error, Debug)]
pub enum GraphError {
    /// Node not found by identifier
    #[error("Node '{0}' not found")]
    NodeNotFound(String),

    /// Group not found by identifier
    #[error("Group '{0}' not found")]
    GroupNotFound(String),

    /// Node referenced as a group is not a partition node
    #[error("Node '{0}' is not a group")]
    NotAGroup(String),

    /// Node already exists
    #[error("Node '{0}' already exists")]
    NodeAlreadyExists(String),

    /// A group cannot contain itself, directly or through its descendants
    #[error("Node '{node}' cannot belong to '{group}': membership cycle")]
    MembershipCycle {
        /// Node being moved
        node: String,
        /// Group it would be moved into
        group: String,
    },

    /// Aggregation row index past the end of a group's rows
    #[error("Aggregation {index} out of range for group '{group}' ({len} rows)")]
    AggregationIndexOutOfRange {
        /// Group identifier
        group: String,
        /// Requested row
        index: usize,
        /// Number of rows on the group
        len: usize,
    },

    /// Invalid graph structure
    #[error("Invalid graph structure: {0}")]
    InvalidStructure(String),

    /// Aggregation engine failure while recomputing a group
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
}

impl GraphError {
    /// Check if this is a client error (400-series)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GraphError::NotAGroup(_)
                | GraphError::NodeAlreadyExists(_)
                | GraphError::MembershipCycle { .. }
                | GraphError::AggregationIndexOutOfRange { .. }
                | GraphError::InvalidStructure(_)
        )
    }

    /// Check if this is a not found error (404)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GraphError::NodeNotFound(_) | GraphError::GroupNotFound(_)
        )
    }

    /// Get error code for reports and logs
    pub fn error_code(&self) -> &'static str {
        match self {
            GraphError::NodeNotFound(_) | GraphError::GroupNotFound(_) => "NOT_FOUND",
            GraphError::NotAGroup(_)
            | GraphError::AggregationIndexOutOfRange { .. }
            | GraphError::InvalidStructure(_) => "VALIDATION_FAILED",
            GraphError::NodeAlreadyExists(_) => "CONFLICT",
            GraphError::MembershipCycle { .. } => "CYCLE_DETECTED",
            GraphError::Aggregation(err) => err.error_code(),
        }
    }
}
