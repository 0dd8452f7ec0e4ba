//! Names and values shared by every producer and consumer.
//!
//! These form the wire contract: any client talking to the same store must
//! use exactly these values.

/// Queue holding tasks waiting for a consumer (LIST).
pub const PENDING_QUEUE: &str = "pending";

/// Queue holding tasks claimed by a consumer (LIST).
pub const INPROGRESS_QUEUE: &str = "inprogress";

/// Value of a task's `options` field when it has no parameters.
///
/// Never a valid record id: ids are 36-char hyphenated UUIDs.
pub const NO_OPTIONS: &str = "__no_options__";

/// Payload published on the pending channel after each enqueue.
pub const TASK_QUEUED: &str = "task_queued";

/// Task record field names.
pub mod fields {
    pub const MODULE: &str = "module";
    pub const TIMEOUT: &str = "timeout";
    pub const OPTIONS: &str = "options";
}
