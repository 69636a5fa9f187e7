// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! td-sync: Offline-first synchronization for the td task list
//!
//! This crate provides the remote client contract and its HTTP
//! implementation, the retry scheduler, listener notifications, and the
//! [`SyncEngine`] that ties them to a local cache.

pub mod engine;
pub mod events;
pub mod remote;
pub mod retry;

#[cfg(test)]
mod test_helpers;

pub use engine::{SyncEngine, SyncHandle, SyncStatus};
pub use events::{SyncEvent, SyncListener};
pub use remote::{
    HttpConfig, HttpRemote, OfflineRemote, RemoteClient, RemoteError, RemoteResult, RemoteState,
};
pub use retry::{RetryInfo, RetryKey};
