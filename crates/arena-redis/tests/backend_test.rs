// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! End-to-end backend tests: re-registration semantics, request validation
//! and room result storage.
//!
//! Requires a local Redis server; tests skip when none is reachable.

mod common;

use std::time::Duration;

use arena_core::{
    AddContainerRequest, Backend, DeleteContainerRequest, ErrorStatus, Frontend,
    GetRoomResultRequest, SetRoomResultRequest, ToContainerEvent,
};

use common::{add_container_req, allocate_req, arena, must_recv};

/// Re-registering a container replaces its capacity and wipes the bindings
/// of the prior incarnation, so previously bound rooms can be allocated
/// afresh.
#[tokio::test]
async fn test_add_container_overwrites_existing() {
    let Some(arena) = arena().await else { return };
    let fleet = "fleet1";

    let _con1 = arena
        .backend
        .add_container(add_container_req("con1", fleet, 1))
        .await
        .expect("failed to add con1");

    let room1 = arena
        .frontend
        .allocate_room(allocate_req("room1", fleet))
        .await
        .expect("failed to allocate room1");
    assert_eq!(room1.container_id, "con1");

    // Full at 1/1.
    let err = arena
        .frontend
        .allocate_room(allocate_req("room2", fleet))
        .await
        .unwrap_err();
    assert!(err.has_status(ErrorStatus::ResourceExhausted));

    // Same container again with capacity 2: overwrite, not add.
    let mut con1_again = arena
        .backend
        .add_container(add_container_req("con1", fleet, 2))
        .await
        .expect("failed to re-add con1");

    // room1's old binding is gone, so allocating it again works and lands
    // on the fresh incarnation.
    let room1_again = arena
        .frontend
        .allocate_room(allocate_req("room1", fleet))
        .await
        .expect("failed to re-allocate room1");
    assert_eq!(room1_again.container_id, "con1");

    let room2 = arena
        .frontend
        .allocate_room(allocate_req("room2", fleet))
        .await
        .expect("failed to allocate room2");
    assert_eq!(room2.container_id, "con1");

    // Full again at 2/2.
    let err = arena
        .frontend
        .allocate_room(allocate_req("room3", fleet))
        .await
        .unwrap_err();
    assert!(err.has_status(ErrorStatus::ResourceExhausted));

    // Both allocations arrived on the second incarnation's channel.
    for expected in ["room1", "room2"] {
        match must_recv(&mut con1_again.event_channel).await {
            ToContainerEvent::Allocation(ev) => assert_eq!(ev.room_id, expected),
            other => panic!("expected AllocationEvent, got {other:?}"),
        }
    }

    arena
        .backend
        .delete_container(DeleteContainerRequest {
            container_id: "con1".to_string(),
            fleet_name: fleet.to_string(),
        })
        .await
        .expect("failed to delete con1");
}

/// Deleting a container frees its rooms for nothing: bindings are gone and
/// the fleet has no capacity left.
#[tokio::test]
async fn test_delete_container_tears_down_state() {
    let Some(arena) = arena().await else { return };
    let fleet = "fleet1";

    let _con1 = arena
        .backend
        .add_container(add_container_req("con1", fleet, 2))
        .await
        .expect("failed to add con1");
    arena
        .frontend
        .allocate_room(allocate_req("room1", fleet))
        .await
        .expect("failed to allocate room1");

    arena
        .backend
        .delete_container(DeleteContainerRequest {
            container_id: "con1".to_string(),
            fleet_name: fleet.to_string(),
        })
        .await
        .expect("failed to delete con1");

    // Binding destroyed along with the container.
    let err = arena
        .frontend
        .notify_to_room(arena_core::NotifyToRoomRequest {
            room_id: "room1".to_string(),
            fleet_name: fleet.to_string(),
            body: b"hello".to_vec(),
        })
        .await
        .unwrap_err();
    assert!(err.has_status(ErrorStatus::NotFound));

    let err = arena
        .frontend
        .allocate_room(allocate_req("room2", fleet))
        .await
        .unwrap_err();
    assert!(err.has_status(ErrorStatus::ResourceExhausted));
}

#[tokio::test]
async fn test_add_container_validation() {
    let Some(arena) = arena().await else { return };

    for req in [
        add_container_req("", "fleet1", 2),
        add_container_req("con1", "", 2),
        add_container_req("con1", "fleet1", 0),
        add_container_req("con1", "fleet1", -1),
        AddContainerRequest {
            heartbeat_ttl: Some(Duration::from_millis(100)),
            ..add_container_req("con1", "fleet1", 2)
        },
    ] {
        let err = arena.backend.add_container(req).await.unwrap_err();
        assert!(err.has_status(ErrorStatus::InvalidRequest));
    }
}

/// Result blobs round-trip through the store and expire with their TTL.
#[tokio::test]
async fn test_room_result_round_trip() {
    let Some(arena) = arena().await else { return };

    let err = arena
        .frontend
        .get_room_result(GetRoomResultRequest {
            room_id: "room1".to_string(),
        })
        .await
        .unwrap_err();
    assert!(err.has_status(ErrorStatus::NotFound));

    arena
        .backend
        .set_room_result(SetRoomResultRequest {
            room_id: "room1".to_string(),
            room_result_data: b"winner: red team".to_vec(),
            result_data_ttl: Duration::from_secs(60),
        })
        .await
        .expect("failed to set room result");

    let result = arena
        .frontend
        .get_room_result(GetRoomResultRequest {
            room_id: "room1".to_string(),
        })
        .await
        .expect("failed to get room result");
    assert_eq!(result.room_id, "room1");
    assert_eq!(result.room_result_data, b"winner: red team");

    // A short TTL takes the blob with it.
    arena
        .backend
        .set_room_result(SetRoomResultRequest {
            room_id: "room2".to_string(),
            room_result_data: b"draw".to_vec(),
            result_data_ttl: Duration::from_secs(1),
        })
        .await
        .expect("failed to set room result");
    tokio::time::sleep(Duration::from_secs(2)).await;
    let err = arena
        .frontend
        .get_room_result(GetRoomResultRequest {
            room_id: "room2".to_string(),
        })
        .await
        .unwrap_err();
    assert!(err.has_status(ErrorStatus::NotFound));
}

#[tokio::test]
async fn test_set_room_result_validation() {
    let Some(arena) = arena().await else { return };

    for req in [
        SetRoomResultRequest {
            room_id: String::new(),
            room_result_data: b"data".to_vec(),
            result_data_ttl: Duration::from_secs(60),
        },
        SetRoomResultRequest {
            room_id: "room1".to_string(),
            room_result_data: Vec::new(),
            result_data_ttl: Duration::from_secs(60),
        },
        SetRoomResultRequest {
            room_id: "room1".to_string(),
            room_result_data: b"data".to_vec(),
            result_data_ttl: Duration::ZERO,
        },
    ] {
        let err = arena.backend.set_room_result(req).await.unwrap_err();
        assert!(err.has_status(ErrorStatus::InvalidRequest));
    }
}
