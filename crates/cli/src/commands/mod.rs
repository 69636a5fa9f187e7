// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod add;
pub mod edit;
pub mod lifecycle;
pub mod list;
pub mod status;
pub mod sync;
#[cfg(test)]
#[path = "mod_tests.rs"]
pub mod testing;

use td_core::{Item, SqliteCache};
use td_sync::{HttpRemote, OfflineRemote, RemoteClient, RetryKey, SyncEngine};

use crate::config::Config;
use crate::display::short_id;
use crate::error::{Error, Result};

pub type Engine = SyncEngine<SqliteCache, Box<dyn RemoteClient>>;

/// Which remote a session talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteMode {
    /// The configured backend at this URL.
    Remote(String),
    /// No `[remote]` section in the config.
    LocalOnly,
    /// `--offline` was given.
    Offline,
}

/// An engine over the configured cache and remote, with its startup check done.
pub struct Session {
    pub engine: Engine,
    pub mode: RemoteMode,
}

impl Session {
    pub async fn open(config: &Config, offline: bool) -> Result<Session> {
        let cache = SqliteCache::open(&config.db_path()?)?;
        let (remote, mode): (Box<dyn RemoteClient>, RemoteMode) = match &config.remote {
            _ if offline => (Box::new(OfflineRemote), RemoteMode::Offline),
            Some(remote) => (
                Box::new(HttpRemote::new(remote.http_config())?),
                RemoteMode::Remote(remote.url.clone()),
            ),
            None => (Box::new(OfflineRemote), RemoteMode::LocalOnly),
        };
        let session = Session {
            engine: SyncEngine::new(cache, remote, config.retry.policy()),
            mode,
        };
        session.engine.load().wait().await;
        Ok(session)
    }

    /// Warns on stderr when the remote has not acknowledged a change to `id`.
    pub fn report_deferred(&self, id: &str) {
        if !matches!(self.mode, RemoteMode::Remote(_)) {
            return;
        }
        let key = RetryKey::Item(id.to_string());
        if self.engine.pending_retries().iter().any(|r| r.key == key) {
            eprintln!(
                "warning: {} saved locally; remote unreachable, will sync later",
                short_id(id)
            );
        }
    }

    /// Drops pending retries; the cache keeps whatever is still unsynced.
    pub fn close(self) {
        self.engine.shutdown();
    }
}

/// Resolves a full id or a unique id prefix against `items`.
pub fn resolve_id(items: &[Item], partial_id: &str) -> Result<String> {
    if items.iter().any(|item| item.id == partial_id) {
        return Ok(partial_id.to_string());
    }
    let matches: Vec<String> = items
        .iter()
        .filter(|item| item.id.starts_with(partial_id))
        .map(|item| item.id.clone())
        .collect();
    match matches.as_slice() {
        [] => Err(Error::ItemNotFound(partial_id.to_string())),
        [id] => Ok(id.clone()),
        _ => Err(Error::AmbiguousId {
            prefix: partial_id.to_string(),
            matches,
        }),
    }
}

/// Resolves every id up front so a typo aborts before anything changes.
pub fn resolve_ids(items: &[Item], partial_ids: &[String]) -> Result<Vec<String>> {
    partial_ids
        .iter()
        .map(|partial| resolve_id(items, partial))
        .collect()
}
