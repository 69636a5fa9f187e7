// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote client abstraction for the revision-based backend.
//!
//! Provides a trait-based client layer that enables:
//! - A real HTTP client for production ([`HttpRemote`])
//! - An always-offline client for local-only mode ([`OfflineRemote`])
//! - Scripted mock clients for unit testing
//!
//! No client retries internally; the sync engine owns retry policy.

mod http;
mod protocol;

use std::future::Future;
use std::pin::Pin;

use td_core::Item;

pub use http::{HttpConfig, HttpRemote};
pub use protocol::{ElementRequest, ListRequest, Response, WireImportance, WireItem};

/// Error type for remote operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Connection failed, timed out, or no remote is configured.
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    /// The backend rejected the request (HTTP 400 and other client errors).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The bearer token was rejected (HTTP 401).
    #[error("authorization rejected\n  hint: check the remote token in your config")]
    AuthRejected,

    /// The item does not exist on the backend (HTTP 404).
    #[error("not found on remote")]
    NotFound,

    /// The backend failed (HTTP 5xx).
    #[error("server error: {0}")]
    ServerError(String),

    /// The response body could not be decoded or lacked required fields.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl RemoteError {
    /// Whether repeating the same request later may succeed.
    ///
    /// Rejections and undecodable answers are not transient: the backend
    /// disagrees with our view of the data, or may have applied the change
    /// without us learning the revision. Only a bulk sync resolves either.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RemoteError::NetworkUnavailable(_) | RemoteError::ServerError(_)
        )
    }
}

/// Result type for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Boxed future returned by [`RemoteClient`] methods.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = RemoteResult<T>> + Send + 'a>>;

/// Authoritative collection state reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteState {
    pub items: Vec<Item>,
    pub revision: i64,
}

/// Client for the revision-based backend.
///
/// Methods take `&self` so several requests can be in flight at once.
pub trait RemoteClient: Send + Sync {
    /// Creates an item, returning the new revision.
    fn add(&self, item: Item, known_revision: i64) -> RemoteFuture<'_, i64>;

    /// Overwrites an item, returning the new revision.
    fn update(&self, item: Item, known_revision: i64) -> RemoteFuture<'_, i64>;

    /// Deletes an item, returning the new revision.
    fn delete(&self, id: String, known_revision: i64) -> RemoteFuture<'_, i64>;

    /// Pulls the authoritative item set and revision.
    fn fetch_all(&self) -> RemoteFuture<'_, RemoteState>;

    /// Pushes the full local set; the backend answers with the merged set.
    fn bulk_sync(&self, items: Vec<Item>, known_revision: i64) -> RemoteFuture<'_, RemoteState>;
}

impl<T: RemoteClient + ?Sized> RemoteClient for Box<T> {
    fn add(&self, item: Item, known_revision: i64) -> RemoteFuture<'_, i64> {
        (**self).add(item, known_revision)
    }

    fn update(&self, item: Item, known_revision: i64) -> RemoteFuture<'_, i64> {
        (**self).update(item, known_revision)
    }

    fn delete(&self, id: String, known_revision: i64) -> RemoteFuture<'_, i64> {
        (**self).delete(id, known_revision)
    }

    fn fetch_all(&self) -> RemoteFuture<'_, RemoteState> {
        (**self).fetch_all()
    }

    fn bulk_sync(&self, items: Vec<Item>, known_revision: i64) -> RemoteFuture<'_, RemoteState> {
        (**self).bulk_sync(items, known_revision)
    }
}

/// Remote used when no backend is configured.
///
/// Every call fails with [`RemoteError::NetworkUnavailable`], so local
/// changes stay dirty until a real remote is set up.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineRemote;

impl OfflineRemote {
    fn unavailable<T: Send + 'static>() -> RemoteFuture<'static, T> {
        Box::pin(async {
            Err(RemoteError::NetworkUnavailable(
                "no remote configured".to_string(),
            ))
        })
    }
}

impl RemoteClient for OfflineRemote {
    fn add(&self, _item: Item, _known_revision: i64) -> RemoteFuture<'_, i64> {
        Self::unavailable()
    }

    fn update(&self, _item: Item, _known_revision: i64) -> RemoteFuture<'_, i64> {
        Self::unavailable()
    }

    fn delete(&self, _id: String, _known_revision: i64) -> RemoteFuture<'_, i64> {
        Self::unavailable()
    }

    fn fetch_all(&self) -> RemoteFuture<'_, RemoteState> {
        Self::unavailable()
    }

    fn bulk_sync(&self, _items: Vec<Item>, _known_revision: i64) -> RemoteFuture<'_, RemoteState> {
        Self::unavailable()
    }
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
