//! # rb-core - Task lifecycle protocol for the rb task queue
//!
//! Producers enqueue a task (a module name, a timeout and flat options)
//! onto a shared pending queue; consumers atomically move it to the
//! in-progress queue and read back its full payload.
//!
//! This crate provides:
//! - `Store` trait: the primitives required from the shared store
//! - `Client`: `enqueue`, `requeue`, `materialize`, `claim`
//! - `Consumer`: claims tasks, waking on enqueue announcements and polling
//!   as a fallback
//! - `MemoryStore` for tests and local development
//! - Wire constants, id generation and error types
//!
//! ```rust,no_run
//! use rb_core::{Client, MemoryStore};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> rb_core::Result<()> {
//!     let client = Client::new(MemoryStore::new());
//!     let queued = client.enqueue("job.task", 2000, &json!({"retries": 3})).await?;
//!     let claimed = client.claim().await?.expect("task was just queued");
//!     assert_eq!(claimed.id, queued.task_id);
//!     Ok(())
//! }
//! ```

mod client;
mod config;
pub mod constants;
mod consumer;
mod error;
mod ids;
mod memory;
mod store;
mod task;

pub use client::Client;
pub use config::{ClientConfig, ClientConfigBuilder, ConsumerConfig};
pub use constants::{INPROGRESS_QUEUE, NO_OPTIONS, PENDING_QUEUE, TASK_QUEUED};
pub use consumer::Consumer;
pub use error::{RbError, Result};
pub use ids::{is_record_id, IdGenerator, TaskId, UuidGenerator};
pub use memory::MemoryStore;
pub use store::{DynStore, Notifications, Reply, SharedStore, Store, WriteOp};
pub use task::{Claimed, Enqueued, Task};
