//! Error types for the rb task queue.

use thiserror::Error;

use crate::ids::TaskId;

/// The main error type for the rb task queue.
#[derive(Error, Debug)]
pub enum RbError {
    /// The module name looks like a filesystem path.
    #[error("Invalid module name: {0} (module should not be a path)")]
    InvalidModuleName(String),

    /// An option value is not a string, number or boolean.
    #[error("Task options must be a flat object: `{0}` is not a scalar")]
    NonFlatOptions(String),

    /// The options value did not serialize to an object.
    #[error("Task options must be a flat object, got {0}")]
    OptionsNotObject(String),

    /// Store connection or command error.
    #[error("Store error: {0}")]
    Store(String),

    /// The transaction committed but its replies did not have the expected shape.
    #[error("Insertion mismatch: {0}")]
    InsertionMismatch(String),

    /// Atomic transfer between two queues failed.
    #[error("Transfer from {from} to {to} failed: {reason}")]
    TransferFailed {
        from: String,
        to: String,
        reason: String,
    },

    /// Nothing is stored under the identifier.
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// A task record is missing a field or holds an unreadable value.
    #[error("Corrupt record {id}: {reason}")]
    CorruptRecord { id: String, reason: String },

    /// The options field is neither the sentinel nor a record id.
    #[error("Task {task_id} has an invalid options reference: {reference}")]
    InvalidOptionsReference { task_id: String, reference: String },

    /// A claimed task was transferred but could not be materialized.
    ///
    /// The identifier is left in `queue`; the caller decides whether to
    /// move it back.
    #[error("Task {task_id} stranded in {queue}: {source}")]
    Stranded {
        task_id: TaskId,
        queue: String,
        #[source]
        source: Box<RbError>,
    },

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using RbError.
pub type Result<T> = std::result::Result<T, RbError>;
