// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared harness for the end-to-end suite.
//!
//! Tests run against a real Redis server (default `redis://127.0.0.1:6379`,
//! override with `ARENA_REDIS_URL`) under a unique key prefix per test, so
//! concurrent tests never see each other's keys. When no server answers,
//! tests skip instead of failing; CI without Redis still runs the unit
//! suite.

#![allow(dead_code)] // each test binary uses a subset of the harness

use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use arena_core::{
    AddContainerRequest, AllocateRoomRequest, ToContainerEvent,
};
use arena_redis::{ArenaConfig, RedisBackend, RedisFrontend, RedisMetrics};

pub const CHAN_READ_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Arena {
    pub frontend: RedisFrontend,
    pub backend: RedisBackend,
    pub metrics: RedisMetrics,
    pub config: ArenaConfig,
}

/// Connect all three roles under a fresh key prefix, or `None` when no
/// Redis server is reachable.
pub async fn arena() -> Option<Arena> {
    arena_with(|config| config).await
}

/// Like [`arena`], with a hook to adjust the configuration first.
pub async fn arena_with(configure: impl FnOnce(ArenaConfig) -> ArenaConfig) -> Option<Arena> {
    let url = std::env::var("ARENA_REDIS_URL")
        .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let config = configure(ArenaConfig::new(
        &url,
        format!("arenatest_{}:", Uuid::new_v4()),
    ));

    let frontend = match RedisFrontend::connect(&config).await {
        Ok(frontend) => frontend,
        Err(err) => {
            eprintln!("skipping test: no redis server reachable at {url} ({err})");
            return None;
        }
    };
    let backend = RedisBackend::connect(&config)
        .await
        .expect("failed to connect backend");
    let metrics = RedisMetrics::connect(&config)
        .await
        .expect("failed to connect metrics");
    Some(Arena {
        frontend,
        backend,
        metrics,
        config,
    })
}

/// Raw store connection for asserting directly against the keyspace.
pub async fn raw_conn(config: &ArenaConfig) -> redis::aio::MultiplexedConnection {
    redis::Client::open(config.redis_url.as_str())
        .expect("invalid redis url")
        .get_multiplexed_async_connection()
        .await
        .expect("failed to open raw connection")
}

pub fn add_container_req(container_id: &str, fleet_name: &str, capacity: i64) -> AddContainerRequest {
    AddContainerRequest {
        container_id: container_id.to_string(),
        fleet_name: fleet_name.to_string(),
        initial_capacity: capacity,
        heartbeat_ttl: None,
    }
}

pub fn allocate_req(room_id: &str, fleet_name: &str) -> AllocateRoomRequest {
    AllocateRoomRequest {
        room_id: room_id.to_string(),
        fleet_name: fleet_name.to_string(),
        room_initial_data: Vec::new(),
    }
}

/// Receive the next event or fail the test after [`CHAN_READ_TIMEOUT`].
pub async fn must_recv(ch: &mut mpsc::Receiver<ToContainerEvent>) -> ToContainerEvent {
    tokio::time::timeout(CHAN_READ_TIMEOUT, ch.recv())
        .await
        .expect("timed out waiting for container event")
        .expect("event channel closed")
}

/// Assert that no event arrives within `wait`.
pub async fn must_not_recv(ch: &mut mpsc::Receiver<ToContainerEvent>, wait: Duration) {
    if let Ok(Some(event)) = tokio::time::timeout(wait, ch.recv()).await {
        panic!("expected no event, got {event:?}");
    }
}
