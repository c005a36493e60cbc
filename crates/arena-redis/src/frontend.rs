// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Redis-backed [`Frontend`]: room allocation and notify routing.

use std::sync::Arc;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::Script;
use redis::aio::MultiplexedConnection;
use tracing::{debug, instrument};

use arena_core::{
    AllocateRoomRequest, AllocateRoomResponse, ArenaError, Frontend, GetRoomResultRequest,
    GetRoomResultResponse, NotifyToRoomRequest, Result,
};

use crate::codec;
use crate::config::ArenaConfig;
use crate::keys;
use crate::scripts;

/// Redis-backed implementation of [`Frontend`]. Stateless; cheap to clone.
#[derive(Clone)]
pub struct RedisFrontend {
    key_prefix: String,
    conn: MultiplexedConnection,
    allocate_script: Arc<Script>,
}

impl RedisFrontend {
    /// Build a frontend over an existing multiplexed connection.
    pub fn new(key_prefix: impl Into<String>, conn: MultiplexedConnection) -> Self {
        Self {
            key_prefix: key_prefix.into(),
            conn,
            allocate_script: Arc::new(scripts::allocate_room()),
        }
    }

    /// Connect to the coordination store described by `config`.
    pub async fn connect(config: &ArenaConfig) -> Result<Self> {
        let client = redis::Client::open(config.redis_url.as_str())
            .map_err(|e| ArenaError::unknown(format!("invalid redis url: {e}")))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| ArenaError::unknown(format!("failed to connect to redis: {e}")))?;
        Ok(Self::new(config.key_prefix.clone(), conn))
    }
}

#[async_trait]
impl Frontend for RedisFrontend {
    #[instrument(skip(self, req), fields(room_id = %req.room_id, fleet = %req.fleet_name))]
    async fn allocate_room(&self, req: AllocateRoomRequest) -> Result<AllocateRoomResponse> {
        if req.room_id.is_empty() {
            return Err(ArenaError::invalid_request("missing room id"));
        }
        if req.fleet_name.is_empty() {
            return Err(ArenaError::invalid_request("missing fleet name"));
        }

        let event = codec::encode_allocation_event(&req.room_id, &req.room_initial_data)?;
        let mut conn = self.conn.clone();
        let container_id: Option<String> = self
            .allocate_script
            .key(keys::room_container(
                &self.key_prefix,
                &req.fleet_name,
                &req.room_id,
            ))
            .key(keys::container_index(&self.key_prefix, &req.fleet_name))
            .key(keys::container_rooms_prefix(
                &self.key_prefix,
                &req.fleet_name,
            ))
            .key(keys::container_channel_prefix(
                &self.key_prefix,
                &req.fleet_name,
            ))
            .key(keys::heartbeat_prefix(&self.key_prefix, &req.fleet_name))
            .arg(&req.room_id)
            .arg(&req.fleet_name)
            .arg(event)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| ArenaError::unknown(format!("failed to exec allocate script: {e}")))?;

        match container_id {
            Some(container_id) => {
                debug!(%container_id, "room allocated");
                Ok(AllocateRoomResponse {
                    room_id: req.room_id,
                    container_id,
                })
            }
            None => Err(ArenaError::resource_exhausted(format!(
                "no live container with free capacity in fleet '{}'",
                req.fleet_name
            ))),
        }
    }

    #[instrument(skip(self, req), fields(room_id = %req.room_id, fleet = %req.fleet_name))]
    async fn notify_to_room(&self, req: NotifyToRoomRequest) -> Result<()> {
        if req.room_id.is_empty() {
            return Err(ArenaError::invalid_request("missing room id"));
        }
        if req.fleet_name.is_empty() {
            return Err(ArenaError::invalid_request("missing fleet name"));
        }
        if req.body.is_empty() {
            return Err(ArenaError::invalid_request("missing body"));
        }

        let mut conn = self.conn.clone();
        let container_id: Option<String> = conn
            .get(keys::room_container(
                &self.key_prefix,
                &req.fleet_name,
                &req.room_id,
            ))
            .await
            .map_err(|e| ArenaError::unknown(format!("failed to read room binding: {e}")))?;
        let Some(container_id) = container_id else {
            return Err(ArenaError::not_found(format!(
                "room '{}' has no container binding in fleet '{}'",
                req.room_id, req.fleet_name
            )));
        };

        let event = codec::encode_notify_to_room_event(&req.room_id, &req.body)?;
        // Best-effort at-most-once: a zero receiver count is not an error.
        let _: i64 = conn
            .publish(
                keys::container_channel(&self.key_prefix, &req.fleet_name, &container_id),
                event,
            )
            .await
            .map_err(|e| ArenaError::unknown(format!("failed to publish notify event: {e}")))?;
        Ok(())
    }

    #[instrument(skip(self, req), fields(room_id = %req.room_id))]
    async fn get_room_result(&self, req: GetRoomResultRequest) -> Result<GetRoomResultResponse> {
        if req.room_id.is_empty() {
            return Err(ArenaError::invalid_request("missing room id"));
        }
        let mut conn = self.conn.clone();
        let data: Option<Vec<u8>> = conn
            .get(keys::room_result(&self.key_prefix, &req.room_id))
            .await
            .map_err(|e| ArenaError::unknown(format!("failed to read room result: {e}")))?;
        match data {
            Some(room_result_data) => Ok(GetRoomResultResponse {
                room_id: req.room_id,
                room_result_data,
            }),
            None => Err(ArenaError::not_found(format!(
                "no result stored for room '{}'",
                req.room_id
            ))),
        }
    }
}
