//! Store abstraction for task records and queues.
//!
//! The task lifecycle only needs a handful of primitives from the shared
//! store: an atomic batch of writes, an atomic tail-to-head list transfer,
//! flat mapping reads and publish/subscribe. Implementations must be
//! thread-safe (Send + Sync).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::Result;

/// A write staged inside a [`Store::transaction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Set fields of the flat mapping at `key`. Acknowledged with [`Reply::Ok`].
    SetMapping {
        key: String,
        fields: Vec<(String, String)>,
    },
    /// Push `id` onto the head of `queue`. Acknowledged with the new length.
    PushQueue { queue: String, id: String },
}

/// Per-operation acknowledgement returned by a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Integer(i64),
    Other(String),
}

/// Messages received on a subscribed channel.
///
/// Messages are wake-up hints, not a backlog: stores forward into a channel
/// of [`Notifications::CAPACITY`] and drop what does not fit. The stream
/// ends when the underlying subscription is closed, and dropping it tells
/// the store to release the subscription.
#[derive(Debug)]
pub struct Notifications {
    rx: mpsc::Receiver<String>,
}

impl Notifications {
    /// Buffer size for the forwarding channel.
    pub const CAPACITY: usize = 1;

    /// Create a forwarding channel and wrap its receiving half.
    pub fn channel() -> (mpsc::Sender<String>, Self) {
        let (tx, rx) = mpsc::channel(Self::CAPACITY);
        (tx, Self::new(rx))
    }

    /// Wrap the receiving half of a forwarding channel.
    pub fn new(rx: mpsc::Receiver<String>) -> Self {
        Self { rx }
    }

    /// Wait for the next message. Returns `None` once the subscription is gone.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Take a message that has already arrived, without waiting.
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

/// Store trait for task records and queues.
#[async_trait]
pub trait Store: Send + Sync {
    /// Apply all `ops` atomically and return one reply per op, in order.
    async fn transaction(&self, ops: Vec<WriteOp>) -> Result<Vec<Reply>>;

    /// Atomically pop the tail of `src` and push it onto the head of `dst`.
    ///
    /// Returns `None` when `src` is empty.
    async fn transfer_tail(&self, src: &str, dst: &str) -> Result<Option<String>>;

    /// Read the flat mapping stored at `key`. Absent and empty are both `None`.
    async fn get_mapping(&self, key: &str) -> Result<Option<HashMap<String, String>>>;

    /// Publish `message` on `channel`.
    async fn publish(&self, channel: &str, message: &str) -> Result<()>;

    /// Subscribe to `channel`.
    async fn subscribe(&self, channel: &str) -> Result<Notifications>;

    /// Get the number of ids in `queue`.
    async fn queue_len(&self, queue: &str) -> Result<usize>;
}

/// A type-erased store that can be shared across threads.
pub type DynStore = Arc<dyn Store>;

/// Wrapper around Arc<dyn Store> for convenience.
#[derive(Clone)]
pub struct SharedStore {
    inner: DynStore,
}

impl SharedStore {
    /// Create a new SharedStore from any Store implementation.
    pub fn new<S: Store + 'static>(store: S) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Get a reference to the inner store.
    pub fn inner(&self) -> &DynStore {
        &self.inner
    }
}

#[async_trait]
impl Store for SharedStore {
    async fn transaction(&self, ops: Vec<WriteOp>) -> Result<Vec<Reply>> {
        self.inner.transaction(ops).await
    }

    async fn transfer_tail(&self, src: &str, dst: &str) -> Result<Option<String>> {
        self.inner.transfer_tail(src, dst).await
    }

    async fn get_mapping(&self, key: &str) -> Result<Option<HashMap<String, String>>> {
        self.inner.get_mapping(key).await
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<()> {
        self.inner.publish(channel, message).await
    }

    async fn subscribe(&self, channel: &str) -> Result<Notifications> {
        self.inner.subscribe(channel).await
    }

    async fn queue_len(&self, queue: &str) -> Result<usize> {
        self.inner.queue_len(queue).await
    }
}
