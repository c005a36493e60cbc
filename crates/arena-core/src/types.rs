// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Request, response and event types for the arena operation contracts.

use std::time::Duration;

use tokio::sync::mpsc;

/// Request to allocate a room somewhere in a fleet.
#[derive(Debug, Clone, Default)]
pub struct AllocateRoomRequest {
    /// Room identifier. Allocating the same room twice returns the original
    /// binding without publishing a second event.
    pub room_id: String,
    /// Fleet to allocate in.
    pub fleet_name: String,
    /// Opaque payload delivered to the chosen container with the
    /// allocation event.
    pub room_initial_data: Vec<u8>,
}

/// Successful allocation: the room is now bound to `container_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocateRoomResponse {
    pub room_id: String,
    pub container_id: String,
}

/// Request to push a message to the container owning a room.
#[derive(Debug, Clone, Default)]
pub struct NotifyToRoomRequest {
    pub room_id: String,
    pub fleet_name: String,
    /// Opaque payload delivered as-is. Delivery is best-effort at-most-once.
    pub body: Vec<u8>,
}

/// Request to read a room's result blob.
#[derive(Debug, Clone, Default)]
pub struct GetRoomResultRequest {
    pub room_id: String,
}

/// A room's stored result blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRoomResultResponse {
    pub room_id: String,
    pub room_result_data: Vec<u8>,
}

/// Request to register a container with a fleet.
#[derive(Debug, Clone, Default)]
pub struct AddContainerRequest {
    pub container_id: String,
    pub fleet_name: String,
    /// Number of rooms this container can host. Must be positive. On
    /// re-registration the new capacity fully replaces the old one.
    pub initial_capacity: i64,
    /// Heartbeat TTL; [`DEFAULT_HEARTBEAT_TTL`] when `None`.
    ///
    /// [`DEFAULT_HEARTBEAT_TTL`]: crate::DEFAULT_HEARTBEAT_TTL
    pub heartbeat_ttl: Option<Duration>,
}

/// Response to [`AddContainerRequest`]: the live event channel.
#[derive(Debug)]
pub struct AddContainerResponse {
    /// Delivers allocation and notify events for this container. Events are
    /// dropped when the buffer is full; consumers that care reconcile via
    /// the metrics read side and the room bindings.
    pub event_channel: mpsc::Receiver<ToContainerEvent>,
}

/// Request to remove a container and all its derived state.
#[derive(Debug, Clone, Default)]
pub struct DeleteContainerRequest {
    pub container_id: String,
    pub fleet_name: String,
}

/// Request to release a room, returning one unit of capacity to its
/// container.
#[derive(Debug, Clone, Default)]
pub struct ReleaseRoomRequest {
    pub container_id: String,
    pub fleet_name: String,
    pub room_id: String,
}

/// Request to refresh a container's heartbeat.
#[derive(Debug, Clone, Default)]
pub struct SendHeartbeatRequest {
    pub container_id: String,
    pub fleet_name: String,
}

/// Request to store a room's result blob with expiry.
#[derive(Debug, Clone, Default)]
pub struct SetRoomResultRequest {
    pub room_id: String,
    pub room_result_data: Vec<u8>,
    /// How long the blob is retained. Must be non-zero.
    pub result_data_ttl: Duration,
}

/// An event pushed to a container over its channel.
///
/// Closed sum: the wire protocol knows exactly these two shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToContainerEvent {
    /// A room was allocated to this container; start it.
    Allocation(AllocationEvent),
    /// A caller pushed a message to a room this container owns.
    NotifyToRoom(NotifyToRoomEvent),
}

/// Payload of [`ToContainerEvent::Allocation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationEvent {
    pub room_id: String,
    pub room_initial_data: Vec<u8>,
}

/// Payload of [`ToContainerEvent::NotifyToRoom`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyToRoomEvent {
    pub room_id: String,
    pub body: Vec<u8>,
}

/// A container's identity and free capacity, as reported by the metrics
/// read side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerCapacity {
    pub container_id: String,
    pub capacity: i64,
}
