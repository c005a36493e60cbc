// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Redis-backed implementation of the arena room allocation service.
//!
//! This crate implements the `arena-core` contracts against a
//! Redis-compatible coordination store. All shared state lives in a flat
//! keyspace under a caller-supplied prefix; cross-key invariants are
//! enforced by server-side Lua scripts, so every mutation observed by any
//! reader is consistent.
//!
//! # Roles
//!
//! - [`RedisFrontend`] - stateless: allocates rooms via the atomic
//!   allocate-room script and routes notify messages to the owning
//!   container.
//! - [`RedisBackend`] - embedded in each container process: registers
//!   containers, maintains heartbeat liveness, releases rooms. Each
//!   registered container runs an event loop on a dedicated pub/sub
//!   connection and delivers typed [`ToContainerEvent`]s on a bounded
//!   channel.
//! - [`RedisMetrics`] - read side: per-fleet container count and alive
//!   free capacity, garbage-collecting expired index members as it scans.
//!
//! # Delivery semantics
//!
//! Event delivery is at-most-once: pub/sub is not persistent, and the
//! per-container buffer drops on overflow. The allocation binding itself is
//! always durable in the store; consumers that care reconcile through
//! [`Metrics::get_containers`] and the room bindings.
//!
//! # Quick Start
//!
//! ```ignore
//! use arena_core::{AddContainerRequest, AllocateRoomRequest, Backend, Frontend};
//! use arena_redis::{ArenaConfig, RedisBackend, RedisFrontend};
//!
//! let config = ArenaConfig::from_env()?;
//! let backend = RedisBackend::connect(&config).await?;
//! let frontend = RedisFrontend::connect(&config).await?;
//!
//! let mut con1 = backend
//!     .add_container(AddContainerRequest {
//!         container_id: "con1".into(),
//!         fleet_name: "fleet1".into(),
//!         initial_capacity: 2,
//!         heartbeat_ttl: None,
//!     })
//!     .await?;
//!
//! let room = frontend
//!     .allocate_room(AllocateRoomRequest {
//!         room_id: "room1".into(),
//!         fleet_name: "fleet1".into(),
//!         room_initial_data: Vec::new(),
//!     })
//!     .await?;
//! assert_eq!(room.container_id, "con1");
//!
//! let event = con1.event_channel.recv().await;
//! ```
//!
//! [`ToContainerEvent`]: arena_core::ToContainerEvent
//! [`Metrics::get_containers`]: arena_core::Metrics::get_containers

mod backend;
mod codec;
mod config;
mod container;
mod frontend;
mod keys;
mod metrics;
mod scripts;

pub use backend::RedisBackend;
pub use config::ArenaConfig;
pub use frontend::RedisFrontend;
pub use metrics::RedisMetrics;
