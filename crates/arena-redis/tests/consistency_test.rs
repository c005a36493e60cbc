// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Keyspace-level invariant checks: capacity conservation, binding
//! symmetry, re-registration wipe, and drop-on-backpressure delivery.
//!
//! These tests look at the raw keys behind the API to verify what every
//! reader of the shared store must be able to rely on. Requires a local
//! Redis server; tests skip when none is reachable.

mod common;

use std::time::Duration;

use redis::AsyncCommands;

use arena_core::{Backend, Frontend, ReleaseRoomRequest, ToContainerEvent};

use common::{add_container_req, allocate_req, arena, arena_with, must_not_recv, must_recv, raw_conn};

/// The index score of an alive container always equals its initial
/// capacity minus the number of live bindings to it.
#[tokio::test]
async fn test_capacity_conservation() {
    let Some(arena) = arena().await else { return };
    let fleet = "fleet1";
    let index_key = format!("{}container_index:{fleet}", arena.config.key_prefix);
    let mut raw = raw_conn(&arena.config).await;

    let _con1 = arena
        .backend
        .add_container(add_container_req("con1", fleet, 3))
        .await
        .expect("failed to add con1");
    let score: Option<i64> = raw.zscore(&index_key, "con1").await.unwrap();
    assert_eq!(score, Some(3));

    for room_id in ["room1", "room2"] {
        arena
            .frontend
            .allocate_room(allocate_req(room_id, fleet))
            .await
            .expect("failed to allocate");
    }
    let score: Option<i64> = raw.zscore(&index_key, "con1").await.unwrap();
    assert_eq!(score, Some(1));

    arena
        .backend
        .release_room(ReleaseRoomRequest {
            container_id: "con1".to_string(),
            fleet_name: fleet.to_string(),
            room_id: "room1".to_string(),
        })
        .await
        .expect("failed to release room1");
    let score: Option<i64> = raw.zscore(&index_key, "con1").await.unwrap();
    assert_eq!(score, Some(2));
}

/// A room binding and its reverse-index membership always exist together.
#[tokio::test]
async fn test_binding_symmetry() {
    let Some(arena) = arena().await else { return };
    let fleet = "fleet1";
    let prefix = &arena.config.key_prefix;
    let binding_key = format!("{prefix}room_container:{fleet}:room1");
    let rooms_key = format!("{prefix}container_rooms:{fleet}:con1");
    let mut raw = raw_conn(&arena.config).await;

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

    let bound: Option<String> = raw.get(&binding_key).await.unwrap();
    assert_eq!(bound.as_deref(), Some("con1"));
    let member: bool = raw.sismember(&rooms_key, "room1").await.unwrap();
    assert!(member);

    arena
        .backend
        .release_room(ReleaseRoomRequest {
            container_id: "con1".to_string(),
            fleet_name: fleet.to_string(),
            room_id: "room1".to_string(),
        })
        .await
        .expect("failed to release room1");

    let bound: Option<String> = raw.get(&binding_key).await.unwrap();
    assert_eq!(bound, None);
    let member: bool = raw.sismember(&rooms_key, "room1").await.unwrap();
    assert!(!member);
}

/// Re-registration resets the index score exactly and leaves no binding of
/// the prior incarnation behind.
#[tokio::test]
async fn test_reregistration_resets_keyspace() {
    let Some(arena) = arena().await else { return };
    let fleet = "fleet1";
    let prefix = &arena.config.key_prefix;
    let mut raw = raw_conn(&arena.config).await;

    let _con1 = arena
        .backend
        .add_container(add_container_req("con1", fleet, 1))
        .await
        .expect("failed to add con1");
    arena
        .frontend
        .allocate_room(allocate_req("room1", fleet))
        .await
        .expect("failed to allocate room1");

    let _con1_again = arena
        .backend
        .add_container(add_container_req("con1", fleet, 5))
        .await
        .expect("failed to re-add con1");

    let score: Option<i64> = raw
        .zscore(format!("{prefix}container_index:{fleet}"), "con1")
        .await
        .unwrap();
    assert_eq!(score, Some(5));
    let bound: Option<String> = raw
        .get(format!("{prefix}room_container:{fleet}:room1"))
        .await
        .unwrap();
    assert_eq!(bound, None);
    let rooms: Vec<String> = raw
        .smembers(format!("{prefix}container_rooms:{fleet}:con1"))
        .await
        .unwrap();
    assert!(rooms.is_empty());
}

/// With a full event buffer the producer never blocks: excess events are
/// dropped, and the bindings still exist for reconciliation.
#[tokio::test]
async fn test_event_channel_drops_on_backpressure() {
    let Some(arena) = arena_with(|config| config.with_event_buffer_size(1)).await else {
        return;
    };
    let fleet = "fleet1";

    let mut con1 = arena
        .backend
        .add_container(add_container_req("con1", fleet, 3))
        .await
        .expect("failed to add con1");

    // Nobody drains the channel while three allocations land.
    for room_id in ["room1", "room2", "room3"] {
        let room = arena
            .frontend
            .allocate_room(allocate_req(room_id, fleet))
            .await
            .expect("failed to allocate");
        assert_eq!(room.container_id, "con1");
    }
    // Give pub/sub delivery a moment to fill (and overflow) the buffer.
    tokio::time::sleep(Duration::from_secs(1)).await;

    // Exactly the first event survived.
    match must_recv(&mut con1.event_channel).await {
        ToContainerEvent::Allocation(ev) => assert_eq!(ev.room_id, "room1"),
        other => panic!("expected AllocationEvent, got {other:?}"),
    }
    must_not_recv(&mut con1.event_channel, Duration::from_secs(1)).await;
}
