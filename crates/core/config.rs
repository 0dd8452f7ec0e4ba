//! Configuration types for the task queue.

use std::time::Duration;

use crate::error::{RbError, Result};

/// Environment variable holding the store URL.
pub const URL_ENV: &str = "REDIS_URL";

/// Environment variable holding the optional key namespace.
pub const NAMESPACE_ENV: &str = "RB_NAMESPACE";

/// Connection settings for a store-backed client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Store connection URL.
    pub url: String,
    /// Optional prefix applied to every key and channel.
    ///
    /// Clients only interoperate when they agree on the namespace.
    pub namespace: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            namespace: None,
        }
    }
}

impl ClientConfig {
    /// Create a new ClientConfig without a namespace.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            namespace: None,
        }
    }

    /// Create a new builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Read `REDIS_URL` and `RB_NAMESPACE`, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(url) = lookup(URL_ENV) {
            if url.trim().is_empty() {
                return Err(RbError::Config(format!("{} is set but empty", URL_ENV)));
            }
            config.url = url;
        }
        config.namespace = lookup(NAMESPACE_ENV).filter(|ns| !ns.is_empty());
        Ok(config)
    }
}

/// Builder for ClientConfig.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the store URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Set the key namespace.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = Some(namespace.into());
        self
    }

    /// Build the ClientConfig.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// Settings for a [`Consumer`](crate::Consumer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// How long to wait for a notification before polling the queue again.
    pub poll_interval: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl ConsumerConfig {
    /// Set the poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.url, "redis://127.0.0.1:6379");
        assert_eq!(config.namespace, None);
    }

    #[test]
    fn test_client_config_builder_fluent_chain() {
        let config = ClientConfig::builder()
            .url("redis://cache:6379/2")
            .namespace("staging")
            .build();
        assert_eq!(config.url, "redis://cache:6379/2");
        assert_eq!(config.namespace.as_deref(), Some("staging"));
    }

    #[test]
    fn test_client_config_from_lookup() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("REDIS_URL", "redis://queue:6379"),
            ("RB_NAMESPACE", "jobs"),
        ]))
        .unwrap();
        assert_eq!(config.url, "redis://queue:6379");
        assert_eq!(config.namespace.as_deref(), Some("jobs"));
    }

    #[test]
    fn test_client_config_from_lookup_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[("RB_NAMESPACE", "")])).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_client_config_from_lookup_empty_url() {
        let err = ClientConfig::from_lookup(lookup(&[("REDIS_URL", " ")])).unwrap_err();
        assert!(matches!(err, RbError::Config(_)));
    }

    #[test]
    fn test_consumer_config() {
        assert_eq!(ConsumerConfig::default().poll_interval, Duration::from_secs(1));
        let config = ConsumerConfig::default().poll_interval(Duration::from_millis(50));
        assert_eq!(config.poll_interval, Duration::from_millis(50));
    }
}
