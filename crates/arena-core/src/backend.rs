// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Backend operation contract, embedded in each container process.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    AddContainerRequest, AddContainerResponse, DeleteContainerRequest, ReleaseRoomRequest,
    SendHeartbeatRequest, SetRoomResultRequest,
};

/// Heartbeat TTL used when [`AddContainerRequest::heartbeat_ttl`] is `None`.
pub const DEFAULT_HEARTBEAT_TTL: Duration = Duration::from_secs(30);

/// Per-container-process operations: registration, liveness and room
/// lifecycle.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Register a container and return its live event channel.
    ///
    /// Re-registering an existing `(fleet, container)` replaces the capacity
    /// and destroys any room bindings left by the prior incarnation.
    async fn add_container(&self, req: AddContainerRequest) -> Result<AddContainerResponse>;

    /// Remove a container and all its derived state (index entry, room
    /// bindings, heartbeat, in-process handle).
    async fn delete_container(&self, req: DeleteContainerRequest) -> Result<()>;

    /// Release a room, making one unit of capacity available again.
    async fn release_room(&self, req: ReleaseRoomRequest) -> Result<()>;

    /// Refresh the container's heartbeat with the TTL recorded at
    /// registration. `NotFound` when the container is unknown to this
    /// process or its heartbeat has already expired.
    async fn send_heartbeat(&self, req: SendHeartbeatRequest) -> Result<()>;

    /// Store a room's result blob with expiry, for later retrieval via
    /// [`Frontend::get_room_result`].
    ///
    /// [`Frontend::get_room_result`]: crate::Frontend::get_room_result
    async fn set_room_result(&self, req: SetRoomResultRequest) -> Result<()>;
}
