// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Canonical key and channel templates for the shared keyspace.
//!
//! All entities live in one flat keyspace under a caller-supplied prefix,
//! prepended verbatim. The templates are part of the wire contract and must
//! not change: existing deployments interoperate through them. The
//! `*_prefix` variants are handed to the Lua scripts, which append the
//! container ID server-side.

pub(crate) fn heartbeat(prefix: &str, fleet_name: &str, container_id: &str) -> String {
    format!("{prefix}heartbeat:{fleet_name}:{container_id}")
}

pub(crate) fn heartbeat_prefix(prefix: &str, fleet_name: &str) -> String {
    format!("{prefix}heartbeat:{fleet_name}:")
}

pub(crate) fn container_index(prefix: &str, fleet_name: &str) -> String {
    format!("{prefix}container_index:{fleet_name}")
}

pub(crate) fn room_container(prefix: &str, fleet_name: &str, room_id: &str) -> String {
    format!("{prefix}room_container:{fleet_name}:{room_id}")
}

pub(crate) fn room_container_prefix(prefix: &str, fleet_name: &str) -> String {
    format!("{prefix}room_container:{fleet_name}:")
}

pub(crate) fn container_rooms(prefix: &str, fleet_name: &str, container_id: &str) -> String {
    format!("{prefix}container_rooms:{fleet_name}:{container_id}")
}

pub(crate) fn container_rooms_prefix(prefix: &str, fleet_name: &str) -> String {
    format!("{prefix}container_rooms:{fleet_name}:")
}

pub(crate) fn container_channel(prefix: &str, fleet_name: &str, container_id: &str) -> String {
    format!("{prefix}container_channel:{fleet_name}:{container_id}")
}

pub(crate) fn container_channel_prefix(prefix: &str, fleet_name: &str) -> String {
    format!("{prefix}container_channel:{fleet_name}:")
}

pub(crate) fn room_result(prefix: &str, room_id: &str) -> String {
    format!("{prefix}room_result:{room_id}")
}
