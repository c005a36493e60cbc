// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error taxonomy surfaced at the arena boundary.
//!
//! Every fallible operation returns an [`ArenaError`] carrying exactly one
//! [`ErrorStatus`] plus the inner cause. RPC envelopes map the status 1:1 to
//! their transport's equivalent; the inner cause is for logs only.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Boundary status of an [`ArenaError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStatus {
    /// A required field was missing or invalid (e.g. non-positive capacity).
    InvalidRequest,
    /// The referenced room, container or result blob does not exist.
    NotFound,
    /// No live container with free capacity could satisfy the allocation.
    ResourceExhausted,
    /// Store-level failure, encoding failure, or unexpected reply shape.
    Unknown,
}

impl ErrorStatus {
    /// Returns the string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::NotFound => "not_found",
            Self::ResourceExhausted => "resource_exhausted",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error surfaced by an arena operation.
///
/// Wraps the inner cause so callers can classify via [`ArenaError::status`]
/// while logs keep the full chain.
#[derive(Debug, Error)]
#[error("arena error (status: {status}): {source}")]
pub struct ArenaError {
    status: ErrorStatus,
    #[source]
    source: Box<dyn StdError + Send + Sync>,
}

impl ArenaError {
    /// Wrap `source` with the given status.
    pub fn new(
        status: ErrorStatus,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            status,
            source: source.into(),
        }
    }

    /// An `InvalidRequest` error.
    pub fn invalid_request(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::new(ErrorStatus::InvalidRequest, source)
    }

    /// A `NotFound` error.
    pub fn not_found(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::new(ErrorStatus::NotFound, source)
    }

    /// A `ResourceExhausted` error.
    pub fn resource_exhausted(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::new(ErrorStatus::ResourceExhausted, source)
    }

    /// An `Unknown` error.
    pub fn unknown(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::new(ErrorStatus::Unknown, source)
    }

    /// The boundary status of this error.
    pub fn status(&self) -> ErrorStatus {
        self.status
    }

    /// Returns true if this error carries the given status.
    pub fn has_status(&self, status: ErrorStatus) -> bool {
        self.status == status
    }
}

/// Type alias for arena results.
pub type Result<T> = std::result::Result<T, ArenaError>;
