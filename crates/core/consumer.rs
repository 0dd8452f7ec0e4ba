//! Consumer that waits for pending tasks.
//!
//! Enqueue announcements only shorten the wait. The pending queue is always
//! polled again after `poll_interval`, so a missed or dropped notification
//! never loses a task.

use std::time::Duration;
use tokio::time::Instant;

use crate::client::Client;
use crate::config::ConsumerConfig;
use crate::error::Result;
use crate::store::{Notifications, SharedStore, Store};
use crate::task::Claimed;

/// Claims tasks one at a time, waiting when the pending queue is empty.
pub struct Consumer<S: Store + Clone = SharedStore> {
    client: Client<S>,
    config: ConsumerConfig,
    notifications: Option<Notifications>,
}

impl<S: Store + Clone> Consumer<S> {
    /// Create a new consumer.
    pub fn new(client: Client<S>, config: ConsumerConfig) -> Self {
        Self {
            client,
            config,
            notifications: None,
        }
    }

    /// Get the underlying client.
    pub fn client(&self) -> &Client<S> {
        &self.client
    }

    /// Claim a task if one is pending, without waiting.
    pub async fn try_next(&mut self) -> Result<Option<Claimed>> {
        self.client.claim().await
    }

    /// Claim the next task, waiting as long as it takes.
    ///
    /// Not cancel safe: dropping the future while a claim is in flight can
    /// leave the task in the in-progress queue. Use [`Consumer::next_timeout`]
    /// to bound the wait instead of wrapping this in a timeout.
    pub async fn next(&mut self) -> Result<Claimed> {
        self.ensure_subscribed().await;
        loop {
            if let Some(claimed) = self.client.claim().await? {
                return Ok(claimed);
            }
            self.wait().await;
        }
    }

    /// Claim the next task, giving up after `deadline`.
    ///
    /// The deadline only cuts the wait between claims. A claim that has
    /// started runs to completion, so `Ok(None)` means nothing was moved.
    pub async fn next_timeout(&mut self, deadline: Duration) -> Result<Option<Claimed>> {
        let deadline = Instant::now() + deadline;
        self.ensure_subscribed().await;
        loop {
            if let Some(claimed) = self.client.claim().await? {
                return Ok(Some(claimed));
            }
            if tokio::time::timeout_at(deadline, self.wait()).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn ensure_subscribed(&mut self) {
        if self.notifications.is_some() {
            return;
        }
        match self.client.subscribe_pending().await {
            Ok(notifications) => self.notifications = Some(notifications),
            Err(e) => tracing::warn!(error = %e, "Subscribe failed, polling only"),
        }
    }

    /// Sleep until a notification arrives or the poll interval elapses.
    async fn wait(&mut self) {
        let interval = self.config.poll_interval;

        let closed = match self.notifications.as_mut() {
            Some(notifications) => tokio::select! {
                msg = notifications.recv() => msg.is_none(),
                _ = tokio::time::sleep(interval) => false,
            },
            None => {
                tokio::time::sleep(interval).await;
                self.ensure_subscribed().await;
                false
            }
        };

        if closed {
            tracing::debug!("Notification stream closed, falling back to polling");
            self.notifications = None;
            tokio::time::sleep(interval).await;
        }
    }
}
