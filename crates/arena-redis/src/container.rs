// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-process container handle and its event loop.
//!
//! Each registered container owns a dedicated pub/sub connection used only
//! for SUBSCRIBE on its channel; normal commands keep flowing through the
//! shared multiplexed connection. The subscription is confirmed before the
//! caller receives the event channel, so no event published after
//! registration can be missed by a gap between the two.
//!
//! The loop multiplexes three sources: incoming messages (decoded and
//! forwarded without blocking, dropped with an error log when the buffer is
//! full), a periodic self-liveness probe of the heartbeat key (the loop
//! stops itself once the key has vanished), and a stop signal. Decode
//! failures and unknown event names are logged and dropped; they never
//! reach the consumer.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use arena_core::{ArenaError, Result, ToContainerEvent};

use crate::codec;
use crate::keys;

/// Callback invoked once when the event loop detects its own heartbeat has
/// expired. Receives the expired handle so the owner can evict exactly this
/// incarnation; runs after the loop has stopped, outside any lock held by
/// the caller.
pub(crate) type OnExpired = Box<dyn FnOnce(Arc<ContainerHandle>) + Send>;

/// Knobs for a container's event loop.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EventLoopSettings {
    /// Capacity of the event channel handed to the consumer.
    pub(crate) buffer_size: usize,
    /// How often the loop probes its own heartbeat key.
    pub(crate) liveness_check_interval: Duration,
}

/// Handle to a container registered in this process.
pub(crate) struct ContainerHandle {
    container_id: String,
    fleet_name: String,
    heartbeat_key: String,
    conn: MultiplexedConnection,
    stop: CancellationToken,
}

impl ContainerHandle {
    /// Open the dedicated pub/sub connection, confirm the subscription and
    /// spawn the event loop. The returned receiver is live from this point.
    pub(crate) async fn start(
        client: &redis::Client,
        conn: MultiplexedConnection,
        key_prefix: &str,
        fleet_name: &str,
        container_id: &str,
        settings: EventLoopSettings,
        on_expired: OnExpired,
    ) -> Result<(Arc<Self>, mpsc::Receiver<ToContainerEvent>)> {
        let channel = keys::container_channel(key_prefix, fleet_name, container_id);

        let mut pubsub = client
            .get_async_pubsub()
            .await
            .map_err(|e| ArenaError::unknown(format!("failed to open pub/sub connection: {e}")))?;
        // subscribe() completes only after the server confirms the
        // subscription.
        pubsub
            .subscribe(&channel)
            .await
            .map_err(|e| ArenaError::unknown(format!("failed to subscribe to '{channel}': {e}")))?;

        let (tx, rx) = mpsc::channel(settings.buffer_size);
        let handle = Arc::new(Self {
            container_id: container_id.to_string(),
            fleet_name: fleet_name.to_string(),
            heartbeat_key: keys::heartbeat(key_prefix, fleet_name, container_id),
            conn,
            stop: CancellationToken::new(),
        });

        tokio::spawn(run_event_loop(
            pubsub,
            tx,
            handle.clone(),
            settings.liveness_check_interval,
            on_expired,
        ));

        Ok((handle, rx))
    }

    /// Stop the event loop. Idempotent; the dedicated connection is released
    /// when the loop exits.
    pub(crate) fn stop(&self) {
        self.stop.cancel();
    }

    /// Rewrite the heartbeat key with the TTL it already carries.
    ///
    /// `NotFound` when the key has expired; the caller is expected to evict
    /// this handle.
    pub(crate) async fn refresh_heartbeat(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn
            .get(&self.heartbeat_key)
            .await
            .map_err(|e| ArenaError::unknown(format!("failed to read heartbeat: {e}")))?;
        let Some(value) = value else {
            return Err(ArenaError::not_found(format!(
                "heartbeat for container '{}' in fleet '{}' has expired",
                self.container_id, self.fleet_name
            )));
        };
        let ttl = codec::decode_heartbeat_value(&value)?;
        let _: () = conn
            .set_ex(&self.heartbeat_key, value, ttl.as_secs())
            .await
            .map_err(|e| ArenaError::unknown(format!("failed to refresh heartbeat: {e}")))?;
        Ok(())
    }
}

async fn run_event_loop(
    pubsub: redis::aio::PubSub,
    events: mpsc::Sender<ToContainerEvent>,
    handle: Arc<ContainerHandle>,
    liveness_check_interval: Duration,
    on_expired: OnExpired,
) {
    let mut stream = Box::pin(pubsub.into_on_message());
    // The heartbeat key is written just after this loop starts; delay the
    // first probe by one full interval.
    let mut liveness = tokio::time::interval_at(
        tokio::time::Instant::now() + liveness_check_interval,
        liveness_check_interval,
    );
    let mut on_expired = Some(on_expired);

    debug!(
        container_id = %handle.container_id,
        fleet = %handle.fleet_name,
        "container event loop started"
    );

    loop {
        tokio::select! {
            biased;

            _ = handle.stop.cancelled() => {
                debug!(container_id = %handle.container_id, "container event loop stopped");
                break;
            }

            _ = liveness.tick() => {
                let mut conn = handle.conn.clone();
                match conn.exists::<_, bool>(&handle.heartbeat_key).await {
                    Ok(true) => {}
                    Ok(false) => {
                        warn!(
                            container_id = %handle.container_id,
                            fleet = %handle.fleet_name,
                            "heartbeat expired, stopping container event loop"
                        );
                        if let Some(evict) = on_expired.take() {
                            evict(handle.clone());
                        }
                        break;
                    }
                    Err(e) => {
                        error!(
                            container_id = %handle.container_id,
                            error = %e,
                            "failed to probe heartbeat"
                        );
                    }
                }
            }

            msg = stream.next() => {
                match msg {
                    Some(msg) => forward_message(&msg, &events, &handle),
                    None => {
                        warn!(
                            container_id = %handle.container_id,
                            "pub/sub subscription closed unexpectedly, stopping container event loop"
                        );
                        break;
                    }
                }
            }
        }
    }
    // Dropping the message stream releases the dedicated connection.
}

fn forward_message(
    msg: &redis::Msg,
    events: &mpsc::Sender<ToContainerEvent>,
    handle: &ContainerHandle,
) {
    let payload: String = match msg.get_payload() {
        Ok(payload) => payload,
        Err(e) => {
            error!(container_id = %handle.container_id, error = %e, "non-text message on container channel");
            return;
        }
    };
    match codec::decode_to_container_event(&payload) {
        Ok(event) => match events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                error!(
                    container_id = %handle.container_id,
                    ?event,
                    "event channel full, dropping event"
                );
            }
            Err(TrySendError::Closed(_)) => {
                debug!(container_id = %handle.container_id, "event channel closed, dropping event");
            }
        },
        Err(e) => {
            error!(container_id = %handle.container_id, error = %e, "failed to decode container event");
        }
    }
}
