// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Redis-backed [`Backend`]: container registration, liveness and room
//! lifecycle.
//!
//! Registered containers are tracked in an in-process fleet map guarded by
//! a reader/writer lock. `SendHeartbeat` takes the read side; registration,
//! deletion and expiry-driven self-eviction take the write side. Eviction
//! always runs after any read guard has been released and only removes the
//! exact handle incarnation that expired, so a concurrent re-registration
//! is never torn down by a stale eviction.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Script};
use tracing::{debug, info, instrument};

use arena_core::{
    AddContainerRequest, AddContainerResponse, ArenaError, Backend, DEFAULT_HEARTBEAT_TTL,
    DeleteContainerRequest, ReleaseRoomRequest, Result, SendHeartbeatRequest, SetRoomResultRequest,
};

use crate::codec;
use crate::config::ArenaConfig;
use crate::container::{ContainerHandle, EventLoopSettings, OnExpired};
use crate::keys;
use crate::scripts;

/// `(fleet_name, container_id)` identity in the fleet map.
type FleetKey = (String, String);

struct BackendInner {
    key_prefix: String,
    client: redis::Client,
    conn: MultiplexedConnection,
    containers: RwLock<HashMap<FleetKey, Arc<ContainerHandle>>>,
    event_loop_settings: EventLoopSettings,
    delete_script: Script,
    purge_script: Script,
}

/// Redis-backed implementation of [`Backend`].
///
/// Cheap to clone; clones share the fleet map and the multiplexed
/// connection.
#[derive(Clone)]
pub struct RedisBackend {
    inner: Arc<BackendInner>,
}

impl RedisBackend {
    /// Connect to the coordination store described by `config`.
    pub async fn connect(config: &ArenaConfig) -> Result<Self> {
        let client = redis::Client::open(config.redis_url.as_str())
            .map_err(|e| ArenaError::unknown(format!("invalid redis url: {e}")))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| ArenaError::unknown(format!("failed to connect to redis: {e}")))?;
        Ok(Self {
            inner: Arc::new(BackendInner {
                key_prefix: config.key_prefix.clone(),
                client,
                conn,
                containers: RwLock::new(HashMap::new()),
                event_loop_settings: EventLoopSettings {
                    buffer_size: config.event_buffer_size,
                    liveness_check_interval: config.liveness_check_interval,
                },
                delete_script: scripts::delete_container(),
                purge_script: scripts::purge_rooms(),
            }),
        })
    }

    /// Eviction callback handed to a container's event loop: removes the
    /// expired incarnation from the fleet map, if it is still the
    /// registered one.
    fn expiry_eviction(&self, fleet_name: &str, container_id: &str) -> OnExpired {
        let inner = Arc::downgrade(&self.inner);
        let key = (fleet_name.to_string(), container_id.to_string());
        Box::new(move |expired| {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let mut containers = inner
                .containers
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if containers
                .get(&key)
                .is_some_and(|current| Arc::ptr_eq(current, &expired))
            {
                containers.remove(&key);
                debug!(
                    container_id = %key.1,
                    fleet = %key.0,
                    "evicted expired container from fleet map"
                );
            }
        })
    }

    /// Store-side registration: purge stale bindings, overwrite the index
    /// score and write the heartbeat key, then publish the handle in the
    /// fleet map.
    async fn register_container(
        &self,
        req: &AddContainerRequest,
        ttl: Duration,
        handle: &Arc<ContainerHandle>,
    ) -> Result<()> {
        let inner = &self.inner;
        let mut conn = inner.conn.clone();

        let purged: i64 = inner
            .purge_script
            .key(keys::container_rooms(
                &inner.key_prefix,
                &req.fleet_name,
                &req.container_id,
            ))
            .key(keys::room_container_prefix(
                &inner.key_prefix,
                &req.fleet_name,
            ))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                ArenaError::unknown(format!("failed to purge stale room bindings: {e}"))
            })?;
        if purged > 0 {
            debug!(
                container_id = %req.container_id,
                purged,
                "purged room bindings left by a prior incarnation"
            );
        }

        let index_key = keys::container_index(&inner.key_prefix, &req.fleet_name);
        let heartbeat_key = keys::heartbeat(&inner.key_prefix, &req.fleet_name, &req.container_id);
        let heartbeat_value = codec::encode_heartbeat_value(ttl);
        let _: () = redis::pipe()
            .zadd(&index_key, &req.container_id, req.initial_capacity)
            .ignore()
            .set_ex(&heartbeat_key, &heartbeat_value, ttl.as_secs())
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| ArenaError::unknown(format!("failed to register container: {e}")))?;

        let key = (req.fleet_name.clone(), req.container_id.clone());
        let prior = {
            let mut containers = inner
                .containers
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            containers.insert(key, handle.clone())
        };
        if let Some(prior) = prior {
            prior.stop();
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for RedisBackend {
    #[instrument(skip(self, req), fields(container_id = %req.container_id, fleet = %req.fleet_name))]
    async fn add_container(&self, req: AddContainerRequest) -> Result<AddContainerResponse> {
        if req.container_id.is_empty() {
            return Err(ArenaError::invalid_request("missing container id"));
        }
        if req.fleet_name.is_empty() {
            return Err(ArenaError::invalid_request("missing fleet name"));
        }
        if req.initial_capacity <= 0 {
            return Err(ArenaError::invalid_request("invalid capacity"));
        }
        let ttl = req.heartbeat_ttl.unwrap_or(DEFAULT_HEARTBEAT_TTL);
        if ttl.as_secs() == 0 {
            return Err(ArenaError::invalid_request(
                "heartbeat ttl must be at least one second",
            ));
        }

        // The subscription must be confirmed before the container becomes
        // allocatable, or an allocation event could slip through unheard.
        let (handle, event_channel) = ContainerHandle::start(
            &self.inner.client,
            self.inner.conn.clone(),
            &self.inner.key_prefix,
            &req.fleet_name,
            &req.container_id,
            self.inner.event_loop_settings,
            self.expiry_eviction(&req.fleet_name, &req.container_id),
        )
        .await?;

        if let Err(err) = self.register_container(&req, ttl, &handle).await {
            handle.stop();
            return Err(err);
        }

        info!(capacity = req.initial_capacity, "container registered");
        Ok(AddContainerResponse { event_channel })
    }

    #[instrument(skip(self, req), fields(container_id = %req.container_id, fleet = %req.fleet_name))]
    async fn delete_container(&self, req: DeleteContainerRequest) -> Result<()> {
        if req.container_id.is_empty() {
            return Err(ArenaError::invalid_request("missing container id"));
        }
        if req.fleet_name.is_empty() {
            return Err(ArenaError::invalid_request("missing fleet name"));
        }
        let inner = &self.inner;
        let mut conn = inner.conn.clone();

        let removed_capacity: Option<i64> = inner
            .delete_script
            .key(keys::container_index(&inner.key_prefix, &req.fleet_name))
            .arg(&req.container_id)
            .arg(&req.fleet_name)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                ArenaError::unknown(format!("failed to remove container from index: {e}"))
            })?;

        let _: i64 = inner
            .purge_script
            .key(keys::container_rooms(
                &inner.key_prefix,
                &req.fleet_name,
                &req.container_id,
            ))
            .key(keys::room_container_prefix(
                &inner.key_prefix,
                &req.fleet_name,
            ))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| ArenaError::unknown(format!("failed to purge room bindings: {e}")))?;

        let _: () = conn
            .del(keys::heartbeat(
                &inner.key_prefix,
                &req.fleet_name,
                &req.container_id,
            ))
            .await
            .map_err(|e| ArenaError::unknown(format!("failed to delete heartbeat: {e}")))?;

        let handle = {
            let mut containers = inner
                .containers
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            containers.remove(&(req.fleet_name.clone(), req.container_id.clone()))
        };
        if let Some(handle) = handle {
            handle.stop();
        }

        info!(removed_capacity = ?removed_capacity, "container deleted");
        Ok(())
    }

    #[instrument(skip(self, req), fields(container_id = %req.container_id, fleet = %req.fleet_name, room_id = %req.room_id))]
    async fn release_room(&self, req: ReleaseRoomRequest) -> Result<()> {
        if req.container_id.is_empty() {
            return Err(ArenaError::invalid_request("missing container id"));
        }
        if req.fleet_name.is_empty() {
            return Err(ArenaError::invalid_request("missing fleet name"));
        }
        if req.room_id.is_empty() {
            return Err(ArenaError::invalid_request("missing room id"));
        }
        let inner = &self.inner;
        let mut conn = inner.conn.clone();

        // XX INCR: give the capacity back only while the container is still
        // in the index; a released room must not resurrect a deleted member.
        let _: () = redis::pipe()
            .cmd("ZADD")
            .arg(keys::container_index(&inner.key_prefix, &req.fleet_name))
            .arg("XX")
            .arg("INCR")
            .arg(1)
            .arg(&req.container_id)
            .ignore()
            .srem(
                keys::container_rooms(&inner.key_prefix, &req.fleet_name, &req.container_id),
                &req.room_id,
            )
            .ignore()
            .del(keys::room_container(
                &inner.key_prefix,
                &req.fleet_name,
                &req.room_id,
            ))
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| ArenaError::unknown(format!("failed to release room: {e}")))?;

        debug!("room released");
        Ok(())
    }

    #[instrument(skip(self, req), fields(container_id = %req.container_id, fleet = %req.fleet_name))]
    async fn send_heartbeat(&self, req: SendHeartbeatRequest) -> Result<()> {
        if req.container_id.is_empty() {
            return Err(ArenaError::invalid_request("missing container id"));
        }
        if req.fleet_name.is_empty() {
            return Err(ArenaError::invalid_request("missing fleet name"));
        }
        let key = (req.fleet_name.clone(), req.container_id.clone());

        let handle = {
            let containers = self
                .inner
                .containers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            containers.get(&key).cloned()
        };
        let Some(handle) = handle else {
            return Err(ArenaError::not_found(format!(
                "container '{}' is not registered in fleet '{}'",
                req.container_id, req.fleet_name
            )));
        };

        match handle.refresh_heartbeat().await {
            Ok(()) => Ok(()),
            Err(err) if err.has_status(arena_core::ErrorStatus::NotFound) => {
                // The read guard is long gone; evict the expired incarnation.
                let mut containers = self
                    .inner
                    .containers
                    .write()
                    .unwrap_or_else(PoisonError::into_inner);
                if containers
                    .get(&key)
                    .is_some_and(|current| Arc::ptr_eq(current, &handle))
                {
                    containers.remove(&key);
                }
                drop(containers);
                handle.stop();
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self, req), fields(room_id = %req.room_id))]
    async fn set_room_result(&self, req: SetRoomResultRequest) -> Result<()> {
        if req.room_id.is_empty() {
            return Err(ArenaError::invalid_request("missing room id"));
        }
        if req.room_result_data.is_empty() {
            return Err(ArenaError::invalid_request("missing room result data"));
        }
        if req.result_data_ttl.as_secs() == 0 {
            return Err(ArenaError::invalid_request(
                "result data ttl must be at least one second",
            ));
        }
        let mut conn = self.inner.conn.clone();
        let _: () = conn
            .set_ex(
                keys::room_result(&self.inner.key_prefix, &req.room_id),
                req.room_result_data.as_slice(),
                req.result_data_ttl.as_secs(),
            )
            .await
            .map_err(|e| ArenaError::unknown(format!("failed to store room result: {e}")))?;
        Ok(())
    }
}
