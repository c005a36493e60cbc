// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Wire codec for container channel messages and heartbeat values.
//!
//! Channel messages are framed as `"<eventName>:<JSON body>"` with binary
//! fields base64-encoded inside the body. Heartbeat keys hold the plain
//! ASCII value `alive:<ttl-seconds>` so a refresh can restore the TTL
//! without an out-of-band parameter.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use arena_core::{AllocationEvent, ArenaError, NotifyToRoomEvent, Result, ToContainerEvent};

const EVENT_NAME_ALLOCATION: &str = "AllocationEvent";
const EVENT_NAME_NOTIFY_TO_ROOM: &str = "NotifyToRoomEvent";

const HEARTBEAT_VALUE_PREFIX: &str = "alive:";

#[derive(Serialize, Deserialize)]
struct AllocationEventBody {
    room_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    room_initial_data: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct NotifyToRoomEventBody {
    room_id: String,
    body: String,
}

pub(crate) fn encode_allocation_event(room_id: &str, room_initial_data: &[u8]) -> Result<String> {
    let body = AllocationEventBody {
        room_id: room_id.to_string(),
        room_initial_data: if room_initial_data.is_empty() {
            None
        } else {
            Some(BASE64.encode(room_initial_data))
        },
    };
    let json = serde_json::to_string(&body)
        .map_err(|e| ArenaError::unknown(format!("failed to encode AllocationEvent: {e}")))?;
    Ok(format!("{EVENT_NAME_ALLOCATION}:{json}"))
}

pub(crate) fn encode_notify_to_room_event(room_id: &str, body: &[u8]) -> Result<String> {
    let body = NotifyToRoomEventBody {
        room_id: room_id.to_string(),
        body: BASE64.encode(body),
    };
    let json = serde_json::to_string(&body)
        .map_err(|e| ArenaError::unknown(format!("failed to encode NotifyToRoomEvent: {e}")))?;
    Ok(format!("{EVENT_NAME_NOTIFY_TO_ROOM}:{json}"))
}

/// Decode a raw channel message into a typed event.
///
/// Unknown event names are an error; the event loop logs and drops them.
pub(crate) fn decode_to_container_event(data: &str) -> Result<ToContainerEvent> {
    let (event_name, body) = data.split_once(':').ok_or_else(|| {
        ArenaError::unknown("invalid event format, expected '<eventName>:<body>'")
    })?;

    match event_name {
        EVENT_NAME_ALLOCATION => {
            let body: AllocationEventBody = serde_json::from_str(body)
                .map_err(|e| ArenaError::unknown(format!("failed to decode AllocationEvent: {e}")))?;
            if body.room_id.is_empty() {
                return Err(ArenaError::unknown(
                    "failed to decode AllocationEvent: missing room_id",
                ));
            }
            let room_initial_data = match body.room_initial_data {
                Some(encoded) => BASE64.decode(encoded).map_err(|e| {
                    ArenaError::unknown(format!("failed to decode room initial data: {e}"))
                })?,
                None => Vec::new(),
            };
            Ok(ToContainerEvent::Allocation(AllocationEvent {
                room_id: body.room_id,
                room_initial_data,
            }))
        }
        EVENT_NAME_NOTIFY_TO_ROOM => {
            let body: NotifyToRoomEventBody = serde_json::from_str(body).map_err(|e| {
                ArenaError::unknown(format!("failed to decode NotifyToRoomEvent: {e}"))
            })?;
            if body.room_id.is_empty() {
                return Err(ArenaError::unknown(
                    "failed to decode NotifyToRoomEvent: missing room_id",
                ));
            }
            let decoded = BASE64.decode(body.body).map_err(|e| {
                ArenaError::unknown(format!("failed to decode NotifyToRoomEvent body: {e}"))
            })?;
            Ok(ToContainerEvent::NotifyToRoom(NotifyToRoomEvent {
                room_id: body.room_id,
                body: decoded,
            }))
        }
        other => Err(ArenaError::unknown(format!(
            "unknown event name '{other}'"
        ))),
    }
}

pub(crate) fn encode_heartbeat_value(ttl: Duration) -> String {
    format!("{HEARTBEAT_VALUE_PREFIX}{}", ttl.as_secs())
}

pub(crate) fn decode_heartbeat_value(value: &str) -> Result<Duration> {
    let seconds = value
        .strip_prefix(HEARTBEAT_VALUE_PREFIX)
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| {
            ArenaError::unknown(format!("failed to parse heartbeat value '{value}'"))
        })?;
    Ok(Duration::from_secs(seconds))
}
