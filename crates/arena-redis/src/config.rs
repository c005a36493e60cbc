// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for the Redis-backed arena roles.

use std::env;
use std::time::Duration;

use arena_core::{ArenaError, Result};

/// Configuration shared by [`RedisFrontend`], [`RedisBackend`] and
/// [`RedisMetrics`].
///
/// # Environment Variables
///
/// | Variable | Required | Default | Description |
/// |----------|----------|---------|-------------|
/// | `ARENA_REDIS_URL` | No | `redis://127.0.0.1:6379` | Coordination store URL |
/// | `ARENA_KEY_PREFIX` | No | `` | Prefix prepended to every key and channel |
/// | `ARENA_EVENT_BUFFER_SIZE` | No | `1024` | Per-container event channel capacity |
/// | `ARENA_LIVENESS_CHECK_INTERVAL_MS` | No | `10000` | Event-loop self-liveness probe interval |
///
/// [`RedisFrontend`]: crate::RedisFrontend
/// [`RedisBackend`]: crate::RedisBackend
/// [`RedisMetrics`]: crate::RedisMetrics
#[derive(Debug, Clone)]
pub struct ArenaConfig {
    /// Coordination store URL (default: "redis://127.0.0.1:6379").
    pub redis_url: String,
    /// Prefix prepended verbatim to every key and channel name. Lets many
    /// deployments share one store.
    pub key_prefix: String,
    /// Capacity of each container's event channel (default: 1024). The
    /// event loop drops events when the buffer is full.
    pub event_buffer_size: usize,
    /// How often a container's event loop probes its own heartbeat key
    /// (default: 10 s). When the key has vanished the loop stops itself.
    pub liveness_check_interval: Duration,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: String::new(),
            event_buffer_size: 1024,
            liveness_check_interval: Duration::from_secs(10),
        }
    }
}

impl ArenaConfig {
    /// Create a configuration with the given store URL and key prefix.
    pub fn new(redis_url: impl Into<String>, key_prefix: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
            key_prefix: key_prefix.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let redis_url = env::var("ARENA_REDIS_URL").unwrap_or(defaults.redis_url);
        let key_prefix = env::var("ARENA_KEY_PREFIX").unwrap_or(defaults.key_prefix);

        let event_buffer_size = match env::var("ARENA_EVENT_BUFFER_SIZE") {
            Ok(v) => v.parse().map_err(|e| {
                ArenaError::invalid_request(format!("invalid ARENA_EVENT_BUFFER_SIZE: {e}"))
            })?,
            Err(_) => defaults.event_buffer_size,
        };

        let liveness_check_interval = match env::var("ARENA_LIVENESS_CHECK_INTERVAL_MS") {
            Ok(v) => {
                let ms: u64 = v.parse().map_err(|e| {
                    ArenaError::invalid_request(format!(
                        "invalid ARENA_LIVENESS_CHECK_INTERVAL_MS: {e}"
                    ))
                })?;
                Duration::from_millis(ms)
            }
            Err(_) => defaults.liveness_check_interval,
        };

        Ok(Self {
            redis_url,
            key_prefix,
            event_buffer_size,
            liveness_check_interval,
        })
    }

    /// Set the per-container event channel capacity.
    pub fn with_event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }

    /// Set the event-loop self-liveness probe interval.
    pub fn with_liveness_check_interval(mut self, interval: Duration) -> Self {
        self.liveness_check_interval = interval;
        self
    }
}
