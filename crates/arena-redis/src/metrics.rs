// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Redis-backed [`Metrics`]: read-side views over the container index.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tracing::{debug, instrument};

use arena_core::{ArenaError, ContainerCapacity, Metrics, Result};

use crate::config::ArenaConfig;
use crate::keys;

/// Page size for the bounded index scan; keeps single round trips small on
/// large fleets.
const SCAN_PAGE_SIZE: usize = 100;

/// Redis-backed implementation of [`Metrics`]. Cheap to clone.
#[derive(Clone)]
pub struct RedisMetrics {
    key_prefix: String,
    conn: MultiplexedConnection,
}

impl RedisMetrics {
    /// Build a metrics reader over an existing multiplexed connection.
    pub fn new(key_prefix: impl Into<String>, conn: MultiplexedConnection) -> Self {
        Self {
            key_prefix: key_prefix.into(),
            conn,
        }
    }

    /// Connect to the coordination store described by `config`.
    pub async fn connect(config: &ArenaConfig) -> Result<Self> {
        let client = redis::Client::open(config.redis_url.as_str())
            .map_err(|e| ArenaError::unknown(format!("invalid redis url: {e}")))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| ArenaError::unknown(format!("failed to connect to redis: {e}")))?;
        Ok(Self::new(config.key_prefix.clone(), conn))
    }
}

#[async_trait]
impl Metrics for RedisMetrics {
    #[instrument(skip(self), fields(fleet = %fleet_name))]
    async fn get_container_count(&self, fleet_name: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let count: u64 = conn
            .zcard(keys::container_index(&self.key_prefix, fleet_name))
            .await
            .map_err(|e| ArenaError::unknown(format!("failed to read container count: {e}")))?;
        Ok(count)
    }

    #[instrument(skip(self), fields(fleet = %fleet_name))]
    async fn get_containers(&self, fleet_name: &str) -> Result<Vec<ContainerCapacity>> {
        let index_key = keys::container_index(&self.key_prefix, fleet_name);
        let mut conn = self.conn.clone();
        let mut alive = Vec::new();
        let mut expired = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next_cursor, entries): (u64, Vec<(String, f64)>) = redis::cmd("ZSCAN")
                .arg(&index_key)
                .arg(cursor)
                .arg("COUNT")
                .arg(SCAN_PAGE_SIZE)
                .query_async(&mut conn)
                .await
                .map_err(|e| ArenaError::unknown(format!("failed to scan container index: {e}")))?;

            for (container_id, score) in entries {
                let heartbeat_key = keys::heartbeat(&self.key_prefix, fleet_name, &container_id);
                let alive_now: bool = conn.exists(&heartbeat_key).await.map_err(|e| {
                    ArenaError::unknown(format!("failed to probe heartbeat: {e}"))
                })?;
                if !alive_now {
                    expired.push(container_id);
                    continue;
                }
                let capacity = score as i64;
                if capacity >= 1 {
                    alive.push(ContainerCapacity {
                        container_id,
                        capacity,
                    });
                }
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        // Opportunistic GC: expired members leave the index in one batch.
        if !expired.is_empty() {
            debug!(count = expired.len(), "removing expired containers from index");
            let _: i64 = conn
                .zrem(&index_key, &expired)
                .await
                .map_err(|e| {
                    ArenaError::unknown(format!("failed to remove expired containers: {e}"))
                })?;
        }

        Ok(alive)
    }
}
