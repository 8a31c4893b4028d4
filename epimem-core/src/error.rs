//! Errors in the library.
use thiserror::Error;

/// Errors raised by the episodic memory and its array backends.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MemoryError {
    /// A mandatory field is missing or a leaf declaration is malformed.
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// The memory cannot hold a single episode, or a restored cursor exceeds capacity.
    #[error("Capacity error: {0}")]
    CapacityError(String),

    /// An index is outside of the valid range.
    #[error("Index <{index}> is out of memory bounds <{bound}>")]
    IndexError {
        /// The offending index.
        index: usize,
        /// The largest accepted value, inclusive.
        bound: usize,
    },

    /// A batch cannot be sampled from the current memory content.
    #[error("Sampling error: {0}")]
    SamplingError(String),

    /// An experience record does not match the schema.
    #[error("Record error: {0}")]
    RecordError(String),

    /// The array backend failed to read or write a slice.
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Result type of the library.
pub type Result<T> = std::result::Result<T, MemoryError>;
