// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Read-side metrics contract.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ContainerCapacity;

/// Read-side views over a fleet's container index.
#[async_trait]
pub trait Metrics: Send + Sync {
    /// Cardinality of the fleet's container index. May include expired
    /// members that have not been garbage-collected yet.
    async fn get_container_count(&self, fleet_name: &str) -> Result<u64>;

    /// Alive containers with capacity >= 1. Expired members encountered
    /// during the scan are removed from the index before returning.
    async fn get_containers(&self, fleet_name: &str) -> Result<Vec<ContainerCapacity>>;
}
