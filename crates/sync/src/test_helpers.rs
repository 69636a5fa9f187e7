// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted remote, recording listener, and cache doubles for engine tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use td_core::{Error, Item, LocalCache, Result, SqliteCache};
use tokio::sync::Semaphore;

use crate::events::{SyncEvent, SyncListener};
use crate::remote::{RemoteClient, RemoteError, RemoteFuture, RemoteResult, RemoteState};

/// A remote call as seen by [`MockRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Add { id: String, known: i64 },
    Update { id: String, text: String, known: i64 },
    Delete { id: String, known: i64 },
    FetchAll,
    BulkSync { ids: Vec<String>, known: i64 },
}

#[derive(Default)]
struct Script {
    mutations: VecDeque<RemoteResult<i64>>,
    fetches: VecDeque<RemoteResult<RemoteState>>,
    bulk: VecDeque<RemoteResult<RemoteState>>,
}

struct MockState {
    calls: Mutex<Vec<Call>>,
    script: Mutex<Script>,
    revision: AtomicI64,
    gate: Option<Semaphore>,
}

/// Remote double that answers from per-kind scripts.
///
/// Unscripted mutations succeed with the next revision; unscripted fetches
/// report the current revision; unscripted bulk syncs echo the pushed items
/// at the next revision.
#[derive(Clone)]
pub struct MockRemote {
    state: Arc<MockState>,
}

impl MockRemote {
    pub fn new(revision: i64) -> Self {
        Self::build(revision, None)
    }

    /// A remote whose replies wait for [`release`](Self::release).
    pub fn gated(revision: i64) -> Self {
        Self::build(revision, Some(Semaphore::new(0)))
    }

    fn build(revision: i64, gate: Option<Semaphore>) -> Self {
        MockRemote {
            state: Arc::new(MockState {
                calls: Mutex::new(Vec::new()),
                script: Mutex::new(Script::default()),
                revision: AtomicI64::new(revision),
                gate,
            }),
        }
    }

    pub fn release(&self, replies: usize) {
        if let Some(gate) = &self.state.gate {
            gate.add_permits(replies);
        }
    }

    pub fn script_mutation(&self, result: RemoteResult<i64>) {
        self.state.script.lock().unwrap().mutations.push_back(result);
    }

    pub fn script_fetch(&self, result: RemoteResult<RemoteState>) {
        self.state.script.lock().unwrap().fetches.push_back(result);
    }

    pub fn script_bulk(&self, result: RemoteResult<RemoteState>) {
        self.state.script.lock().unwrap().bulk.push_back(result);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn bulk_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::BulkSync { .. }))
            .count()
    }

    fn record(&self, call: Call) {
        self.state.calls.lock().unwrap().push(call);
    }

    fn next_revision(&self) -> i64 {
        self.state.revision.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn wait_gate(&self) {
        if let Some(gate) = &self.state.gate {
            gate.acquire().await.unwrap().forget();
        }
    }

    fn mutation_reply(&self) -> RemoteResult<i64> {
        let scripted = self.state.script.lock().unwrap().mutations.pop_front();
        scripted.unwrap_or_else(|| Ok(self.next_revision()))
    }
}

impl RemoteClient for MockRemote {
    fn add(&self, item: Item, known_revision: i64) -> RemoteFuture<'_, i64> {
        self.record(Call::Add {
            id: item.id,
            known: known_revision,
        });
        Box::pin(async move {
            self.wait_gate().await;
            self.mutation_reply()
        })
    }

    fn update(&self, item: Item, known_revision: i64) -> RemoteFuture<'_, i64> {
        self.record(Call::Update {
            id: item.id,
            text: item.text,
            known: known_revision,
        });
        Box::pin(async move {
            self.wait_gate().await;
            self.mutation_reply()
        })
    }

    fn delete(&self, id: String, known_revision: i64) -> RemoteFuture<'_, i64> {
        self.record(Call::Delete {
            id,
            known: known_revision,
        });
        Box::pin(async move {
            self.wait_gate().await;
            self.mutation_reply()
        })
    }

    fn fetch_all(&self) -> RemoteFuture<'_, RemoteState> {
        self.record(Call::FetchAll);
        Box::pin(async move {
            self.wait_gate().await;
            let scripted = self.state.script.lock().unwrap().fetches.pop_front();
            scripted.unwrap_or_else(|| {
                Ok(RemoteState {
                    items: Vec::new(),
                    revision: self.state.revision.load(Ordering::SeqCst),
                })
            })
        })
    }

    fn bulk_sync(&self, items: Vec<Item>, known_revision: i64) -> RemoteFuture<'_, RemoteState> {
        self.record(Call::BulkSync {
            ids: items.iter().map(|i| i.id.clone()).collect(),
            known: known_revision,
        });
        Box::pin(async move {
            self.wait_gate().await;
            let scripted = self.state.script.lock().unwrap().bulk.pop_front();
            scripted.unwrap_or_else(|| {
                Ok(RemoteState {
                    items,
                    revision: self.next_revision(),
                })
            })
        })
    }
}

/// Listener that records every event it receives.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: SyncEvent) -> usize {
        self.events().iter().filter(|e| **e == event).count()
    }
}

impl SyncListener for RecordingListener {
    fn items_changed(&self) {
        self.events.lock().unwrap().push(SyncEvent::ItemsChanged);
    }

    fn request_started(&self) {
        self.events.lock().unwrap().push(SyncEvent::RequestStarted);
    }

    fn request_ended(&self) {
        self.events.lock().unwrap().push(SyncEvent::RequestEnded);
    }
}

/// Cache whose item table cannot be read.
pub struct UnreadableCache(pub SqliteCache);

impl LocalCache for UnreadableCache {
    fn load_all(&self) -> Result<Vec<Item>> {
        Err(Error::read("database disk image is malformed"))
    }

    fn add(&mut self, item: &Item) -> Result<()> {
        self.0.add(item)
    }

    fn update(&mut self, item: &Item) -> Result<()> {
        self.0.update(item)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.0.delete(id)
    }

    fn reload_all(&mut self, items: &[Item]) -> Result<()> {
        self.0.reload_all(items)
    }

    fn revision(&self) -> Result<i64> {
        self.0.revision()
    }

    fn set_revision(&mut self, revision: i64) -> Result<()> {
        self.0.set_revision(revision)
    }

    fn has_tombstones(&self) -> Result<bool> {
        self.0.has_tombstones()
    }

    fn set_has_tombstones(&mut self, value: bool) -> Result<()> {
        self.0.set_has_tombstones(value)
    }

    fn has_dirty_items(&self) -> Result<bool> {
        self.0.has_dirty_items()
    }

    fn dirty_count(&self) -> Result<usize> {
        self.0.dirty_count()
    }
}

pub fn network_down() -> RemoteError {
    RemoteError::NetworkUnavailable("connection refused".to_string())
}

/// An in-memory cache seeded with `items`, `revision`, and the tombstone flag.
pub fn seeded_cache(items: &[Item], revision: i64, tombstones: bool) -> SqliteCache {
    let mut cache = SqliteCache::open_in_memory().unwrap();
    for item in items {
        cache.add(item).unwrap();
    }
    cache.set_revision(revision).unwrap();
    cache.set_has_tombstones(tombstones).unwrap();
    cache
}

/// Lets spawned tasks and the notification dispatcher run to quiescence.
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}
