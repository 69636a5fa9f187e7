// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// All possible errors that can occur in the tdrs library.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("item not found: {0}")]
    ItemNotFound(String),

    #[error("ambiguous item ID '{prefix}' matches: {}", matches.join(", "))]
    AmbiguousId {
        prefix: String,
        matches: Vec<String>,
    },

    #[error("invalid deadline '{0}'\n  hint: use the YYYY-MM-DD format")]
    InvalidDeadline(String),

    #[error("nothing to change\n  hint: pass at least one field to edit")]
    NothingToEdit,

    #[error("no remote configured\n  hint: add a [remote] section to {0}")]
    NoRemote(String),

    #[error("sync deferred: {0}\n  hint: local changes are kept and retried on the next run")]
    SyncDeferred(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] td_core::Error),

    #[error(transparent)]
    Remote(#[from] td_sync::RemoteError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for tdrs operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
