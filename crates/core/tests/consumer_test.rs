//! Consumer wake-up and polling behavior.

use async_trait::async_trait;
use rb_core::{
    Client, ConsumerConfig, Consumer, MemoryStore, Notifications, Reply, Result, Store, WriteOp,
    INPROGRESS_QUEUE, PENDING_QUEUE,
};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

fn consumer(store: &MemoryStore, poll_interval: Duration) -> Consumer<MemoryStore> {
    Consumer::new(
        Client::with_store(store.clone()),
        ConsumerConfig::default().poll_interval(poll_interval),
    )
}

#[tokio::test]
async fn test_try_next_empty() {
    let store = MemoryStore::new();
    let mut consumer = consumer(&store, Duration::from_millis(10));
    assert!(consumer.try_next().await.unwrap().is_none());
}

#[tokio::test]
async fn test_next_returns_queued_task() {
    let store = MemoryStore::new();
    let mut consumer = consumer(&store, Duration::from_secs(60));
    let queued = consumer
        .client()
        .enqueue("job.task", 500, &json!({"a": 1}))
        .await
        .unwrap();

    let claimed = consumer.next().await.unwrap();
    assert_eq!(claimed.id, queued.task_id);
    assert_eq!(claimed.task.options["a"], "1");
}

#[tokio::test]
async fn test_next_wakes_on_notification() {
    let store = MemoryStore::new();
    // Poll interval far beyond the test deadline: only the notification can wake it.
    let mut consumer = consumer(&store, Duration::from_secs(3600));
    let producer = Client::with_store(store.clone());

    let waiter = tokio::spawn(async move { consumer.next_timeout(Duration::from_secs(5)).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let queued = producer.enqueue("job.task", 500, &json!({})).await.unwrap();

    let claimed = waiter.await.unwrap().unwrap().expect("woken by notification");
    assert_eq!(claimed.id, queued.task_id);
}

#[tokio::test]
async fn test_next_discovers_unannounced_task() {
    let store = MemoryStore::new();
    let seed = Client::with_store(store.clone());
    let queued = seed.enqueue("job.task", 500, &json!({})).await.unwrap();
    // Park it so its announcement is gone before the consumer subscribes.
    seed.requeue(PENDING_QUEUE, "parked").await.unwrap();

    let mut consumer = consumer(&store, Duration::from_millis(20));
    let waiter = tokio::spawn(async move { consumer.next_timeout(Duration::from_secs(5)).await });

    tokio::time::sleep(Duration::from_millis(60)).await;
    seed.requeue("parked", PENDING_QUEUE).await.unwrap();

    let claimed = waiter.await.unwrap().unwrap().expect("found by polling");
    assert_eq!(claimed.id, queued.task_id);
    assert_eq!(store.queue_len(PENDING_QUEUE).await.unwrap(), 0);
}

#[tokio::test]
async fn test_next_timeout_on_empty_queue() {
    let store = MemoryStore::new();
    let mut consumer = consumer(&store, Duration::from_millis(10));
    let claimed = consumer
        .next_timeout(Duration::from_millis(50))
        .await
        .unwrap();
    assert!(claimed.is_none());
}

/// MemoryStore whose record reads take `delay`.
#[derive(Clone)]
struct SlowReads {
    inner: MemoryStore,
    delay: Duration,
}

#[async_trait]
impl Store for SlowReads {
    async fn transaction(&self, ops: Vec<WriteOp>) -> Result<Vec<Reply>> {
        self.inner.transaction(ops).await
    }

    async fn transfer_tail(&self, src: &str, dst: &str) -> Result<Option<String>> {
        self.inner.transfer_tail(src, dst).await
    }

    async fn get_mapping(&self, key: &str) -> Result<Option<HashMap<String, String>>> {
        tokio::time::sleep(self.delay).await;
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

#[tokio::test]
async fn test_next_timeout_completes_claim_in_flight() {
    let store = MemoryStore::new();
    let queued = Client::with_store(store.clone())
        .enqueue("job.task", 500, &json!({"a": 1}))
        .await
        .unwrap();

    let slow = SlowReads {
        inner: store.clone(),
        delay: Duration::from_millis(100),
    };
    let mut consumer = Consumer::new(
        Client::with_store(slow),
        ConsumerConfig::default().poll_interval(Duration::from_millis(10)),
    );

    // The deadline passes while the claimed record is still being read.
    let claimed = consumer
        .next_timeout(Duration::from_millis(50))
        .await
        .unwrap()
        .expect("claim in flight is returned");

    assert_eq!(claimed.id, queued.task_id);
    assert_eq!(claimed.task.options["a"], "1");
    assert_eq!(store.queue_len(PENDING_QUEUE).await.unwrap(), 0);
    assert_eq!(
        store.queue_items(INPROGRESS_QUEUE).await,
        vec![queued.task_id.to_string()]
    );
}

#[tokio::test]
async fn test_next_timeout_leaves_unclaimed_tasks_pending() {
    let store = MemoryStore::new();
    let mut consumer = consumer(&store, Duration::from_millis(10));

    assert!(consumer
        .next_timeout(Duration::from_millis(30))
        .await
        .unwrap()
        .is_none());
    assert_eq!(store.queue_len(INPROGRESS_QUEUE).await.unwrap(), 0);

    let queued = consumer
        .client()
        .enqueue("job.task", 500, &json!({}))
        .await
        .unwrap();
    let claimed = consumer
        .next_timeout(Duration::from_millis(30))
        .await
        .unwrap()
        .expect("queued task");
    assert_eq!(claimed.id, queued.task_id);
}
