//! Enqueue a few tasks and claim them back through Redis.
//!
//! Prerequisites:
//! - Redis server running on localhost:6379 (or set REDIS_URL)
//!
//! Run with: `cargo run -p demo-quickstart`

use rb_core::{
    Client, ClientConfig, Consumer, ConsumerConfig, RbError, INPROGRESS_QUEUE, PENDING_QUEUE,
};
use rb_redis::RedisStore;
use serde_json::json;
use std::time::Duration;

#[tokio::main]
async fn main() -> rb_core::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rb_core=debug".into()),
        )
        .init();

    let config = ClientConfig::from_env()?;
    println!("rb quickstart ({})\n", config.url);

    let store = RedisStore::connect(&config).await?;
    let producer = Client::new(store.clone());

    let queued = producer
        .enqueue("resize.image", 30_000, &json!({"width": 640, "keep_ratio": true}))
        .await?;
    println!("queued {} on {}", queued.task_id, queued.queue);

    let queued = producer.enqueue("send.digest", 5_000, &json!({})).await?;
    println!("queued {} on {}", queued.task_id, queued.queue);

    match producer
        .enqueue("/usr/lib/tasks/cleanup.js", 1_000, &json!({}))
        .await
    {
        Err(e @ RbError::InvalidModuleName(_)) => println!("rejected: {}", e),
        other => println!("unexpected: {:?}", other),
    }
    println!();

    let mut consumer = Consumer::new(
        Client::new(store),
        ConsumerConfig::default().poll_interval(Duration::from_millis(500)),
    );

    while let Some(claimed) = consumer.next_timeout(Duration::from_secs(2)).await? {
        println!(
            "[{}] module={} timeout={}ms options={:?}",
            claimed.id, claimed.task.module, claimed.task.timeout, claimed.task.options
        );
    }

    println!(
        "\npending={} inprogress={}",
        producer.queue_len(PENDING_QUEUE).await?,
        producer.queue_len(INPROGRESS_QUEUE).await?
    );
    Ok(())
}
