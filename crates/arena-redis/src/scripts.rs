// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Server-side Lua scripts.
//!
//! Every cross-key mutation with an atomicity requirement runs as a script
//! on the store; Redis executes scripts single-threaded, so each one is one
//! atomic unit. `redis::Script` invokes by SHA and uploads on NOSCRIPT.
//!
//! Pipelined batches are used only where non-atomic partial success is
//! tolerable (room release, registration writes).

use redis::Script;

/// Pick an alive container with free capacity, bind the room to it and
/// publish the allocation event.
///
/// KEYS: room_container key, container index key, container_rooms prefix,
/// container_channel prefix, heartbeat prefix.
/// ARGV: room ID, fleet name, encoded allocation event.
///
/// Returns the bound container ID, or nil when no live candidate has
/// capacity. An existing binding is returned unchanged: no capacity change,
/// no publish. Candidates whose heartbeat key is gone are removed from the
/// index as they are encountered.
const ALLOCATE_ROOM: &str = r#"
local room_container_key = KEYS[1]
local container_index_key = KEYS[2]
local container_rooms_prefix = KEYS[3]
local container_channel_prefix = KEYS[4]
local heartbeat_prefix = KEYS[5]
local room_id = ARGV[1]
local event = ARGV[3]

local existing = redis.call('GET', room_container_key)
if existing then
    return existing
end

local candidates = redis.call('ZRANGE', container_index_key, '(0', '+inf', 'BYSCORE')
for i = 1, #candidates do
    local container_id = candidates[i]
    if redis.call('EXISTS', heartbeat_prefix .. container_id) == 1 then
        redis.call('ZINCRBY', container_index_key, -1, container_id)
        redis.call('SET', room_container_key, container_id)
        redis.call('SADD', container_rooms_prefix .. container_id, room_id)
        redis.call('PUBLISH', container_channel_prefix .. container_id, event)
        return container_id
    end
    redis.call('ZREM', container_index_key, container_id)
end
return nil
"#;

/// Remove a container from the index, returning the capacity it had
/// (nil when the member was absent).
///
/// KEYS: container index key. ARGV: container ID, fleet name.
const DELETE_CONTAINER: &str = r#"
local container_index_key = KEYS[1]
local container_id = ARGV[1]

local score = redis.call('ZSCORE', container_index_key, container_id)
if not score then
    return nil
end
redis.call('ZREM', container_index_key, container_id)
return tonumber(score)
"#;

/// Destroy every room binding recorded in a container's reverse index, then
/// the index itself. Returns the number of bindings removed.
///
/// KEYS: container_rooms key, room_container prefix.
const PURGE_ROOMS: &str = r#"
local container_rooms_key = KEYS[1]
local room_container_prefix = KEYS[2]

local rooms = redis.call('SMEMBERS', container_rooms_key)
for i = 1, #rooms do
    redis.call('DEL', room_container_prefix .. rooms[i])
end
redis.call('DEL', container_rooms_key)
return #rooms
"#;

pub(crate) fn allocate_room() -> Script {
    Script::new(ALLOCATE_ROOM)
}

pub(crate) fn delete_container() -> Script {
    Script::new(DELETE_CONTAINER)
}

pub(crate) fn purge_rooms() -> Script {
    Script::new(PURGE_ROOMS)
}
