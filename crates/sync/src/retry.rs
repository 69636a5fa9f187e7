// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Timer-based retry scheduling.
//!
//! Each pending retry is keyed by what it retries: an item id, or the
//! collection-wide reconciliation. Scheduling a key that is already
//! pending replaces the earlier retry. Once a retry's timer fires, the
//! retry runs to completion even if its key is cancelled meanwhile.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Boxed task run when a retry fires.
pub type RetryTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// What a pending retry will redo.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RetryKey {
    /// A single-item add, update, or delete.
    Item(String),
    /// The startup check or a bulk sync.
    Reconcile,
}

impl fmt::Display for RetryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryKey::Item(id) => write!(f, "item {id}"),
            RetryKey::Reconcile => write!(f, "reconcile"),
        }
    }
}

/// Description of a scheduled retry.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryInfo {
    pub key: RetryKey,
    /// Zero-based retry attempt.
    pub attempt: u32,
    /// Jittered delay before the retry runs.
    pub delay: Duration,
}

struct Pending {
    info: RetryInfo,
    token: CancellationToken,
    ticket: u64,
}

type PendingMap = Arc<Mutex<HashMap<RetryKey, Pending>>>;

fn lock(pending: &PendingMap) -> MutexGuard<'_, HashMap<RetryKey, Pending>> {
    pending.lock().unwrap_or_else(|e| e.into_inner())
}

/// Schedules delayed retries on the tokio runtime.
pub struct RetryScheduler {
    pending: PendingMap,
    shutdown: CancellationToken,
    next_ticket: AtomicU64,
}

impl RetryScheduler {
    pub fn new() -> Self {
        RetryScheduler {
            pending: Arc::new(Mutex::new(HashMap::new())),
            shutdown: CancellationToken::new(),
            next_ticket: AtomicU64::new(0),
        }
    }

    /// Runs `task` after `info.delay`, replacing any retry pending for the same key.
    ///
    /// Must be called from within a tokio runtime. After [`shutdown`](Self::shutdown)
    /// the task is dropped without running.
    pub fn schedule(&self, info: RetryInfo, task: RetryTask) {
        if self.shutdown.is_cancelled() {
            return;
        }

        let token = self.shutdown.child_token();
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let key = info.key.clone();
        let delay = info.delay;

        let replaced = lock(&self.pending).insert(
            key.clone(),
            Pending {
                info,
                token: token.clone(),
                ticket,
            },
        );
        if let Some(previous) = replaced {
            previous.token.cancel();
        }

        let pending = Arc::clone(&self.pending);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    {
                        let mut map = lock(&pending);
                        if map.get(&key).is_some_and(|p| p.ticket == ticket) {
                            map.remove(&key);
                        }
                    }
                    task.await;
                }
            }
        });
    }

    /// Cancels the retry pending for `key`, if any.
    pub fn cancel(&self, key: &RetryKey) -> bool {
        match lock(&self.pending).remove(key) {
            Some(pending) => {
                pending.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels every pending single-item retry except those for `keep`.
    pub fn cancel_items_except(&self, keep: &HashSet<String>) -> usize {
        let mut map = lock(&self.pending);
        let keys: Vec<RetryKey> = map
            .keys()
            .filter(|key| matches!(key, RetryKey::Item(id) if !keep.contains(id)))
            .cloned()
            .collect();
        for key in &keys {
            if let Some(pending) = map.remove(key) {
                pending.token.cancel();
            }
        }
        keys.len()
    }

    /// Cancels everything and refuses further scheduling.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        lock(&self.pending).clear();
    }

    /// Scheduled retries that have not fired yet, sorted by key.
    pub fn pending(&self) -> Vec<RetryInfo> {
        let mut infos: Vec<RetryInfo> = lock(&self.pending)
            .values()
            .map(|p| p.info.clone())
            .collect();
        infos.sort_by(|a, b| a.key.cmp(&b.key));
        infos
    }

    pub fn len(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RetryScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
