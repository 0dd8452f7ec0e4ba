//! Client for enqueueing, claiming and reading back tasks.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::constants::{INPROGRESS_QUEUE, PENDING_QUEUE, TASK_QUEUED};
use crate::error::{RbError, Result};
use crate::ids::{IdGenerator, TaskId, UuidGenerator};
use crate::store::{Notifications, Reply, SharedStore, Store, WriteOp};
use crate::task::{
    flatten_options, record_fields, validate_module, Claimed, Enqueued, OptionsRef, Task,
    TaskRecord,
};

/// Client for the task lifecycle.
///
/// Holds no task state of its own: every call goes to the store.
#[derive(Clone)]
pub struct Client<S: Store + Clone = SharedStore> {
    store: S,
    ids: Arc<dyn IdGenerator>,
}

impl Client<SharedStore> {
    /// Create a new client with a shared store.
    pub fn new(store: impl Store + 'static) -> Self {
        Self::with_store(SharedStore::new(store))
    }
}

impl<S: Store + Clone> Client<S> {
    /// Create a new client with a specific store.
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            ids: Arc::new(UuidGenerator),
        }
    }

    /// Replace the id generator.
    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    /// Get the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Enqueue a task on the pending queue.
    ///
    /// `options` must serialize to a flat object of strings, numbers and
    /// booleans. Validation happens before anything is written; the task
    /// record, its options record and the queue entry are then inserted in
    /// a single transaction.
    pub async fn enqueue<O>(&self, module: &str, timeout: u64, options: &O) -> Result<Enqueued>
    where
        O: Serialize + ?Sized,
    {
        validate_module(module)?;
        let options = flatten_options(options)?;

        let mut ops = Vec::with_capacity(3);
        // `None` means the reply is not checked.
        let mut expected = Vec::with_capacity(3);

        let options_ref = if options.is_empty() {
            OptionsRef::Empty
        } else {
            let opt_id = self.ids.generate();
            ops.push(WriteOp::SetMapping {
                key: opt_id.clone(),
                fields: options,
            });
            expected.push(Some(Reply::Ok));
            OptionsRef::Record(opt_id)
        };

        let task_id = self.ids.generate();
        ops.push(WriteOp::SetMapping {
            key: task_id.clone(),
            fields: record_fields(module, timeout, &options_ref),
        });
        expected.push(Some(Reply::Ok));

        ops.push(WriteOp::PushQueue {
            queue: PENDING_QUEUE.to_string(),
            id: task_id.clone(),
        });
        expected.push(None);

        let replies = self.store.transaction(ops).await?;
        check_replies(&expected, &replies)?;

        // Only a wake-up hint; consumers find work through the queue itself.
        if let Err(e) = self.store.publish(PENDING_QUEUE, TASK_QUEUED).await {
            tracing::warn!(task_id = %task_id, error = %e, "Failed to announce queued task");
        }

        tracing::debug!(task_id = %task_id, module = %module, "Task enqueued");
        Ok(Enqueued {
            queue: PENDING_QUEUE.to_string(),
            task_id: TaskId::from(task_id),
        })
    }

    /// Atomically move the tail of `from` onto the head of `to`.
    ///
    /// Returns `None` when `from` is empty.
    pub async fn requeue(&self, from: &str, to: &str) -> Result<Option<TaskId>> {
        tracing::trace!(from = %from, to = %to, "Transferring task");
        let moved = self
            .store
            .transfer_tail(from, to)
            .await
            .map_err(|e| RbError::TransferFailed {
                from: from.to_string(),
                to: to.to_string(),
                reason: e.to_string(),
            })?;
        Ok(moved.map(TaskId::from))
    }

    /// Read a task record and resolve its options.
    pub async fn materialize(&self, id: &TaskId) -> Result<Task> {
        let record = self
            .store
            .get_mapping(id.as_str())
            .await?
            .ok_or_else(|| RbError::RecordNotFound(id.to_string()))?;
        let record = TaskRecord::parse(id.as_str(), record)?;

        let options = match &record.options {
            OptionsRef::Empty => {
                tracing::trace!(task_id = %id, "Task has no options");
                BTreeMap::new()
            }
            OptionsRef::Record(opt_id) => {
                tracing::trace!(task_id = %id, options_id = %opt_id, "Fetching task options");
                self.store
                    .get_mapping(opt_id)
                    .await?
                    .ok_or_else(|| RbError::RecordNotFound(opt_id.clone()))?
                    .into_iter()
                    .collect()
            }
        };

        Ok(record.into_task(options))
    }

    /// Move one task from pending to in-progress and read it back.
    ///
    /// Returns `None` when nothing is pending. If the task cannot be read
    /// after the move, the error is [`RbError::Stranded`] and the id stays
    /// in the in-progress queue.
    pub async fn claim(&self) -> Result<Option<Claimed>> {
        let Some(id) = self.requeue(PENDING_QUEUE, INPROGRESS_QUEUE).await? else {
            return Ok(None);
        };
        tracing::debug!(task_id = %id, "Task claimed");

        match self.materialize(&id).await {
            Ok(task) => Ok(Some(Claimed { id, task })),
            Err(e) => {
                tracing::warn!(task_id = %id, error = %e, "Claimed task could not be materialized");
                Err(RbError::Stranded {
                    task_id: id,
                    queue: INPROGRESS_QUEUE.to_string(),
                    source: Box::new(e),
                })
            }
        }
    }

    /// Get the number of tasks in `queue`.
    pub async fn queue_len(&self, queue: &str) -> Result<usize> {
        self.store.queue_len(queue).await
    }

    /// Subscribe to enqueue announcements.
    pub async fn subscribe_pending(&self) -> Result<Notifications> {
        self.store.subscribe(PENDING_QUEUE).await
    }
}

fn check_replies(expected: &[Option<Reply>], replies: &[Reply]) -> Result<()> {
    if expected.len() != replies.len() {
        return Err(RbError::InsertionMismatch(format!(
            "expected {} replies, store returned {}",
            expected.len(),
            replies.len()
        )));
    }
    for (i, (want, got)) in expected.iter().zip(replies).enumerate() {
        if let Some(want) = want {
            if want != got {
                return Err(RbError::InsertionMismatch(format!(
                    "reply {} was {:?}, expected {:?}",
                    i, got, want
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_replies_accepts_any_push_reply() {
        let expected = [Some(Reply::Ok), Some(Reply::Ok), None];
        assert!(check_replies(&expected, &[Reply::Ok, Reply::Ok, Reply::Integer(7)]).is_ok());
        assert!(check_replies(
            &expected,
            &[Reply::Ok, Reply::Ok, Reply::Other("QUEUED".to_string())]
        )
        .is_ok());
    }

    #[test]
    fn test_check_replies_count_mismatch() {
        let err = check_replies(&[Some(Reply::Ok), None], &[Reply::Ok]).unwrap_err();
        assert!(matches!(err, RbError::InsertionMismatch(_)));

        let err = check_replies(&[None], &[Reply::Ok, Reply::Ok]).unwrap_err();
        assert!(err.to_string().contains("expected 1 replies"));
    }

    #[test]
    fn test_check_replies_value_mismatch() {
        let err = check_replies(&[Some(Reply::Ok), None], &[Reply::Integer(0), Reply::Integer(1)])
            .unwrap_err();
        assert!(matches!(err, RbError::InsertionMismatch(ref msg) if msg.contains("reply 0")));
    }
}
