// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! td-core: Shared library for the td task list
//!
//! This crate provides the item model, the in-memory item store, the
//! durable local cache with its sync bookkeeping, and the retry backoff
//! policy used by the sync engine.

pub mod backoff;
pub mod cache;
pub mod error;
pub mod item;
pub mod store;

pub use backoff::BackoffPolicy;
pub use cache::{LocalCache, SqliteCache};
pub use error::{Error, Result};
pub use item::{Importance, Item};
pub use store::ItemStore;
