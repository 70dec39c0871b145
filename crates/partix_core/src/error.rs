//! Error types for Partix core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in Partix core operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Attempted to mutate a composite (derived, read-only) structure.
    #[error("{structure} is read-only: {operation} is not supported")]
    ReadOnly {
        /// The structure that rejected the mutation.
        structure: &'static str,
        /// The rejected operation.
        operation: &'static str,
    },

    /// Range bounds are inverted.
    #[error("invalid range: {message}")]
    InvalidRange {
        /// Description of the range issue.
        message: String,
    },

    /// A range query reached a partition whose index contents are not ordered.
    #[error("partition {partition} holds an unordered index for {extractor}")]
    UnorderedPartition {
        /// The offending partition.
        partition: u32,
        /// The extractor of the index.
        extractor: String,
    },

    /// Partition is not present in the partition table.
    #[error("partition not found: {partition}")]
    PartitionNotFound {
        /// The partition that was not found.
        partition: u32,
    },

    /// No index exists for the extractor in the given partition.
    #[error("no index for {extractor} in partition {partition}")]
    IndexNotFound {
        /// The partition searched.
        partition: u32,
        /// The extractor that has no index.
        extractor: String,
    },

    /// A unique index already maps the attribute value to another key.
    #[error("unique index violation on {extractor}: value already indexed")]
    UniqueViolation {
        /// The extractor of the unique index.
        extractor: String,
    },
}

impl CoreError {
    /// Creates a read-only violation error.
    pub fn read_only(structure: &'static str, operation: &'static str) -> Self {
        Self::ReadOnly {
            structure,
            operation,
        }
    }

    /// Creates an invalid range error.
    pub fn invalid_range(message: impl Into<String>) -> Self {
        Self::InvalidRange {
            message: message.into(),
        }
    }

    /// Returns true if this error reports a read-only violation.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::ReadOnly { .. })
    }
}
