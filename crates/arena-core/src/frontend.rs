// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Frontend operation contract.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    AllocateRoomRequest, AllocateRoomResponse, GetRoomResultRequest, GetRoomResultResponse,
    NotifyToRoomRequest,
};

/// Stateless caller-facing operations: place rooms and route messages to
/// them.
#[async_trait]
pub trait Frontend: Send + Sync {
    /// Pick an alive container with free capacity, bind the room to it and
    /// deliver the allocation event to its process.
    ///
    /// Allocating an already-bound room returns the original binding and
    /// publishes nothing. Returns `ResourceExhausted` when no live container
    /// has capacity.
    async fn allocate_room(&self, req: AllocateRoomRequest) -> Result<AllocateRoomResponse>;

    /// Push a message to the container owning the room. `NotFound` when the
    /// room has no binding. Delivery is best-effort at-most-once.
    async fn notify_to_room(&self, req: NotifyToRoomRequest) -> Result<()>;

    /// Read a room's stored result blob. `NotFound` when absent or expired.
    async fn get_room_result(&self, req: GetRoomResultRequest) -> Result<GetRoomResultResponse>;
}
