// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Arena core - operation contracts for the fleet-aware room allocation
//! service.
//!
//! Three roles share one coordination store:
//!
//! - [`Frontend`] - stateless: allocates rooms and routes messages to them.
//! - [`Backend`] - embedded in each container process: registration,
//!   heartbeats, room release.
//! - [`Metrics`] - read side: per-fleet container count and free capacity.
//!
//! This crate defines the contracts, the request/response types, the
//! [`ToContainerEvent`] sum delivered on a container's event channel, and
//! the error taxonomy ([`ErrorStatus`]). The store-backed implementation
//! lives in `arena-redis`.

pub mod error;

mod backend;
mod frontend;
mod metrics;
mod types;

pub use backend::{Backend, DEFAULT_HEARTBEAT_TTL};
pub use error::{ArenaError, ErrorStatus, Result};
pub use frontend::Frontend;
pub use metrics::Metrics;
pub use types::{
    AddContainerRequest, AddContainerResponse, AllocateRoomRequest, AllocateRoomResponse,
    AllocationEvent, ContainerCapacity, DeleteContainerRequest, GetRoomResultRequest,
    GetRoomResultResponse, NotifyToRoomEvent, NotifyToRoomRequest, ReleaseRoomRequest,
    SendHeartbeatRequest, SetRoomResultRequest, ToContainerEvent,
};
