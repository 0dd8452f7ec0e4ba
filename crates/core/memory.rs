//! In-memory store for tests and local development.
//!
//! All state sits behind one mutex, so every store call is atomic with
//! respect to every other. Clones share the same state.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};

use crate::error::Result;
use crate::store::{Notifications, Reply, Store, WriteOp};

/// Most recent publishes kept for [`MemoryStore::published`].
const PUBLISHED_LOG_LIMIT: usize = 1024;

#[derive(Default)]
struct MemoryState {
    mappings: HashMap<String, HashMap<String, String>>,
    /// Front is the head (push side), back is the tail (pop side).
    queues: HashMap<String, VecDeque<String>>,
    subscribers: Vec<(String, mpsc::Sender<String>)>,
    published: VecDeque<(String, String)>,
}

/// Store kept entirely in process memory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids in `queue`, head first.
    pub async fn queue_items(&self, queue: &str) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .queues
            .get(queue)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The mapping stored at `key`, if any.
    pub async fn mapping(&self, key: &str) -> Option<HashMap<String, String>> {
        self.state.lock().await.mappings.get(key).cloned()
    }

    /// Number of stored mappings (task and options records).
    pub async fn record_count(&self) -> usize {
        self.state.lock().await.mappings.len()
    }

    /// Recent `(channel, message)` publishes, oldest first.
    ///
    /// Only the last 1024 are kept.
    pub async fn published(&self) -> Vec<(String, String)> {
        self.state.lock().await.published.iter().cloned().collect()
    }

    /// Write a mapping directly, bypassing the task protocol.
    pub async fn insert_mapping(&self, key: &str, fields: &[(&str, &str)]) {
        let mut state = self.state.lock().await;
        let entry = state.mappings.entry(key.to_string()).or_default();
        for (field, value) in fields {
            entry.insert(field.to_string(), value.to_string());
        }
    }

    /// Remove one field from a stored mapping.
    pub async fn remove_field(&self, key: &str, field: &str) -> bool {
        let mut state = self.state.lock().await;
        state
            .mappings
            .get_mut(key)
            .map(|m| m.remove(field).is_some())
            .unwrap_or(false)
    }

    /// Push an id onto the head of a queue directly.
    pub async fn push_queue(&self, queue: &str, id: &str) {
        let mut state = self.state.lock().await;
        state
            .queues
            .entry(queue.to_string())
            .or_default()
            .push_front(id.to_string());
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn transaction(&self, ops: Vec<WriteOp>) -> Result<Vec<Reply>> {
        let mut state = self.state.lock().await;
        let mut replies = Vec::with_capacity(ops.len());

        for op in ops {
            match op {
                WriteOp::SetMapping { key, fields } => {
                    state.mappings.entry(key).or_default().extend(fields);
                    replies.push(Reply::Ok);
                }
                WriteOp::PushQueue { queue, id } => {
                    let q = state.queues.entry(queue).or_default();
                    q.push_front(id);
                    replies.push(Reply::Integer(q.len() as i64));
                }
            }
        }

        Ok(replies)
    }

    async fn transfer_tail(&self, src: &str, dst: &str) -> Result<Option<String>> {
        let mut state = self.state.lock().await;
        let Some(id) = state.queues.get_mut(src).and_then(|q| q.pop_back()) else {
            return Ok(None);
        };
        state
            .queues
            .entry(dst.to_string())
            .or_default()
            .push_front(id.clone());
        Ok(Some(id))
    }

    async fn get_mapping(&self, key: &str) -> Result<Option<HashMap<String, String>>> {
        let state = self.state.lock().await;
        Ok(state.mappings.get(key).filter(|m| !m.is_empty()).cloned())
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.published.len() == PUBLISHED_LOG_LIMIT {
            state.published.pop_front();
        }
        state
            .published
            .push_back((channel.to_string(), message.to_string()));

        // A full buffer already holds a wake-up; closed receivers are pruned.
        state.subscribers.retain(|(ch, tx)| {
            ch != channel
                || !matches!(
                    tx.try_send(message.to_string()),
                    Err(TrySendError::Closed(_))
                )
        });
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Notifications> {
        let (tx, notifications) = Notifications::channel();
        self.state
            .lock()
            .await
            .subscribers
            .push((channel.to_string(), tx));
        Ok(notifications)
    }

    async fn queue_len(&self, queue: &str) -> Result<usize> {
        let state = self.state.lock().await;
        Ok(state.queues.get(queue).map(VecDeque::len).unwrap_or(0))
    }
}
