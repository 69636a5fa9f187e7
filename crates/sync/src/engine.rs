// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The sync engine: offline-first, optimistic writes with eventual
//! reconciliation against a revision-based backend.
//!
//! Every mutation is applied to the [`ItemStore`] first, then sent to the
//! remote, and only then persisted to the [`LocalCache`]. A failed call
//! leaves the item dirty (or the tombstone flag set) and schedules a
//! retry. When the local and remote views may have diverged, the engine
//! pushes its whole item set through `bulk_sync` and adopts the answer.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use td_core::{BackoffPolicy, Error, Item, ItemStore, LocalCache};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::events::{Notifier, SyncEvent, SyncListener};
use crate::remote::{RemoteClient, RemoteFuture, RemoteResult, RemoteState};
use crate::retry::{RetryInfo, RetryKey, RetryScheduler, RetryTask};

/// Completion handle for the network half of an engine call.
///
/// The local half has already happened when the handle is returned.
/// Dropping the handle does not cancel the work.
#[derive(Debug)]
pub struct SyncHandle(Option<JoinHandle<()>>);

impl SyncHandle {
    fn spawn(task: RetryTask) -> Self {
        SyncHandle(Some(tokio::spawn(task)))
    }

    /// A handle for a call that needed no remote work.
    fn finished() -> Self {
        SyncHandle(None)
    }

    /// Waits for the first remote attempt (and the cache write that follows
    /// it) to finish. Scheduled retries are not awaited.
    pub async fn wait(self) {
        let Some(handle) = self.0 else {
            return;
        };
        if let Err(e) = handle.await {
            warn!("sync task ended abnormally: {}", e);
        }
    }
}

/// Snapshot of the engine's sync bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    pub items: usize,
    pub revision: i64,
    pub dirty_items: usize,
    pub has_tombstones: bool,
    pub pending_retries: usize,
}

#[derive(Debug, Clone)]
enum Mutation {
    Add(Item),
    Update(Item),
    Delete(String),
}

impl Mutation {
    fn id(&self) -> &str {
        match self {
            Mutation::Add(item) | Mutation::Update(item) => &item.id,
            Mutation::Delete(id) => id,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Mutation::Add(_) => "add",
            Mutation::Update(_) => "update",
            Mutation::Delete(_) => "delete",
        }
    }
}

/// A mutation tagged with the generation of its id at the time it was issued.
#[derive(Debug, Clone)]
struct Issued {
    mutation: Mutation,
    generation: u64,
}

/// A retryable unit of work.
#[derive(Debug, Clone)]
enum Step {
    Mutation(Issued),
    Check { local_load_failed: bool },
    BulkSync,
}

impl Step {
    fn key(&self) -> RetryKey {
        match self {
            Step::Mutation(issued) => RetryKey::Item(issued.mutation.id().to_string()),
            Step::Check { .. } | Step::BulkSync => RetryKey::Reconcile,
        }
    }
}

/// Drives an [`ItemStore`], a [`LocalCache`], and a [`RemoteClient`].
///
/// All methods return without waiting on the network. Methods that start
/// remote work must be called from within a tokio runtime.
pub struct SyncEngine<C, R> {
    inner: Arc<Inner<C, R>>,
}

struct Inner<C, R> {
    store: ItemStore,
    cache: Mutex<C>,
    remote: R,
    policy: BackoffPolicy,
    retries: RetryScheduler,
    notifier: Notifier,
    /// Latest generation issued per id. Held while the store is written,
    /// so local changes and bulk adoption never interleave.
    generations: Mutex<HashMap<String, u64>>,
    next_generation: AtomicU64,
}

impl<C, R> SyncEngine<C, R>
where
    C: LocalCache + 'static,
    R: RemoteClient + 'static,
{
    /// Creates an engine without a listener.
    pub fn new(cache: C, remote: R, policy: BackoffPolicy) -> Self {
        Self::build(cache, remote, policy, Notifier::disabled())
    }

    /// Creates an engine that reports to `listener` from a dedicated dispatch task.
    pub fn with_listener(
        cache: C,
        remote: R,
        policy: BackoffPolicy,
        listener: Arc<dyn SyncListener>,
    ) -> Self {
        Self::build(cache, remote, policy, Notifier::spawn(listener))
    }

    fn build(cache: C, remote: R, policy: BackoffPolicy, notifier: Notifier) -> Self {
        SyncEngine {
            inner: Arc::new(Inner {
                store: ItemStore::new(),
                cache: Mutex::new(cache),
                remote,
                policy,
                retries: RetryScheduler::new(),
                notifier,
                generations: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    /// Current items, in display order.
    pub fn items(&self) -> Vec<Item> {
        self.inner.store.snapshot()
    }

    pub fn get(&self, id: &str) -> Option<Item> {
        self.inner.store.get(id)
    }

    /// Loads the cached items, then checks the remote revision in the background.
    ///
    /// The store is populated before this returns. A bulk sync follows when
    /// there are dirty items or pending deletions, when the revisions
    /// disagree, or when the cache could not be read at all.
    pub fn load(&self) -> SyncHandle {
        let loaded = self.inner.cache().load_all();
        let local_load_failed = match loaded {
            Ok(items) => {
                debug!("loaded {} cached items", items.len());
                self.inner.store.reset(items);
                false
            }
            Err(e) => {
                warn!("failed to load cached items, starting empty: {}", e);
                self.inner.store.reset(Vec::new());
                true
            }
        };
        self.inner.notifier.notify(SyncEvent::ItemsChanged);

        self.inner.retries.cancel(&RetryKey::Reconcile);
        SyncHandle::spawn(Arc::clone(&self.inner).run_check(local_load_failed, 0))
    }

    /// Adds `item` locally and sends it to the remote.
    ///
    /// An id that is already present makes this a no-op: neither the store,
    /// the cache, nor the remote sees the second copy.
    pub fn add(&self, item: Item) -> SyncHandle {
        let local = item.clone();
        self.inner
            .start(Mutation::Add(item), |store| store.upsert_if_absent(local))
    }

    /// Replaces the item with the same id locally and sends it to the remote.
    pub fn update(&self, item: Item) -> SyncHandle {
        let local = item.clone();
        self.inner
            .start(Mutation::Update(item), |store| store.replace(local))
    }

    /// Removes the item locally and asks the remote to delete it.
    pub fn delete(&self, id: &str) -> SyncHandle {
        self.inner
            .start(Mutation::Delete(id.to_string()), |store| store.remove(id))
    }

    /// Pushes the current item set through a bulk sync right away.
    pub fn sync(&self) -> SyncHandle {
        self.inner.retries.cancel(&RetryKey::Reconcile);
        SyncHandle::spawn(Arc::clone(&self.inner).run_bulk_sync(0))
    }

    /// Retries waiting on their timers.
    pub fn pending_retries(&self) -> Vec<RetryInfo> {
        self.inner.retries.pending()
    }

    pub fn status(&self) -> td_core::Result<SyncStatus> {
        let cache = self.inner.cache();
        Ok(SyncStatus {
            items: self.inner.store.len(),
            revision: cache.revision()?,
            dirty_items: cache.dirty_count()?,
            has_tombstones: cache.has_tombstones()?,
            pending_retries: self.inner.retries.len(),
        })
    }

    /// Cancels every pending retry and refuses new ones.
    ///
    /// Requests already in flight still complete and persist their outcome.
    /// Dirty and tombstone flags stay in the cache for the next [`load`](Self::load).
    pub fn shutdown(&self) {
        let pending = self.inner.retries.len();
        self.inner.retries.shutdown();
        if pending > 0 {
            info!("shutdown dropped {} pending retries", pending);
        }
    }
}

impl<C, R> Drop for SyncEngine<C, R> {
    fn drop(&mut self) {
        self.inner.retries.shutdown();
    }
}

impl<C, R> Inner<C, R>
where
    C: LocalCache + 'static,
    R: RemoteClient + 'static,
{
    fn cache(&self) -> MutexGuard<'_, C> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn generations(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        self.generations.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Applies `apply` to the store, then issues `mutation`, superseding
    /// anything still pending for its id.
    ///
    /// A refused add is dropped; updates and deletes of absent ids are
    /// still sent.
    fn start<F>(self: &Arc<Self>, mutation: Mutation, apply: F) -> SyncHandle
    where
        F: FnOnce(&ItemStore) -> bool,
    {
        let id = mutation.id().to_string();
        let generation = {
            let mut generations = self.generations();
            if !apply(&self.store) {
                if matches!(mutation, Mutation::Add(_)) {
                    debug!("item {} already present; add ignored", id);
                    return SyncHandle::finished();
                }
                debug!("item {} not in store; sending {} anyway", id, mutation.name());
            }
            let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
            generations.insert(id.clone(), generation);
            generation
        };
        self.notifier.notify(SyncEvent::ItemsChanged);

        if self.retries.cancel(&RetryKey::Item(id.clone())) {
            debug!("{} of {} supersedes a pending retry", mutation.name(), id);
        }
        SyncHandle::spawn(Arc::clone(self).run_mutation(
            Issued {
                mutation,
                generation,
            },
            0,
        ))
    }

    fn is_current(&self, issued: &Issued) -> bool {
        self.generations().get(issued.mutation.id()).copied() == Some(issued.generation)
    }

    fn known_revision(&self) -> i64 {
        match self.cache().revision() {
            Ok(revision) => revision,
            Err(e) => {
                warn!("failed to read revision, sending 0: {}", e);
                0
            }
        }
    }

    /// Brackets a remote call with request notifications.
    async fn call<T>(&self, request: RemoteFuture<'_, T>) -> RemoteResult<T> {
        self.notifier.notify(SyncEvent::RequestStarted);
        let result = request.await;
        self.notifier.notify(SyncEvent::RequestEnded);
        result
    }

    fn run_step(self: Arc<Self>, step: Step, attempt: u32) -> RetryTask {
        match step {
            Step::Mutation(issued) => self.run_mutation(issued, attempt),
            Step::Check { local_load_failed } => self.run_check(local_load_failed, attempt),
            Step::BulkSync => self.run_bulk_sync(attempt),
        }
    }

    fn run_mutation(self: Arc<Self>, issued: Issued, attempt: u32) -> RetryTask {
        Box::pin(async move {
            let known = self.known_revision();
            let request = match &issued.mutation {
                Mutation::Add(item) => self.remote.add(item.as_clean(), known),
                Mutation::Update(item) => self.remote.update(item.as_clean(), known),
                Mutation::Delete(id) => self.remote.delete(id.clone(), known),
            };
            let result = self.call(request).await;

            let op = issued.mutation.name();
            let id = issued.mutation.id().to_string();
            let current = self.is_current(&issued);
            match result {
                Ok(revision) => {
                    debug!("{} of {} accepted at revision {}", op, id, revision);
                    self.advance_revision(revision);
                    if current {
                        self.persist_accepted(&issued.mutation);
                    } else {
                        debug!("{} of {} was superseded; cache left to newer call", op, id);
                    }
                }
                Err(_) if !current => {
                    debug!("superseded {} of {} failed; dropping", op, id);
                }
                Err(e) => {
                    self.persist_deferred(&issued.mutation);
                    if e.is_transient() {
                        warn!("{} of {} failed, will retry: {}", op, id, e);
                        self.schedule_retry(Step::Mutation(issued), attempt);
                    } else {
                        warn!("{} of {} rejected, reconciling: {}", op, id, e);
                        self.escalate();
                    }
                }
            }
        })
    }

    fn run_check(self: Arc<Self>, local_load_failed: bool, attempt: u32) -> RetryTask {
        Box::pin(async move {
            let fetched = self.call(self.remote.fetch_all()).await;
            match fetched {
                Ok(state) => {
                    if local_load_failed || self.needs_sync(state.revision) {
                        Arc::clone(&self).run_bulk_sync(0).await;
                    } else {
                        debug!("up to date at revision {}", state.revision);
                    }
                }
                Err(e) => {
                    warn!("revision check failed, will retry: {}", e);
                    self.schedule_retry(Step::Check { local_load_failed }, attempt);
                }
            }
        })
    }

    fn run_bulk_sync(self: Arc<Self>, attempt: u32) -> RetryTask {
        Box::pin(async move {
            let (watermark, snapshot) = {
                let _generations = self.generations();
                (
                    self.next_generation.load(Ordering::Relaxed),
                    self.store.snapshot(),
                )
            };
            let items: Vec<Item> = snapshot.iter().map(Item::as_clean).collect();
            let known = self.known_revision();
            let pushed = items.len();
            let synced = self.call(self.remote.bulk_sync(items, known)).await;
            match synced {
                Ok(state) => {
                    let received = state.items.len();
                    let revision = state.revision;
                    let kept = self.adopt(state, watermark);
                    self.notifier.notify(SyncEvent::ItemsChanged);
                    info!(
                        "reconciled: pushed {}, received {} at revision {}",
                        pushed, received, revision
                    );
                    if kept > 0 {
                        debug!("kept {} items changed while the bulk sync was in flight", kept);
                    }
                }
                Err(e) => {
                    warn!("bulk sync failed, will retry: {}", e);
                    self.schedule_retry(Step::BulkSync, attempt);
                }
            }
        })
    }

    /// Installs a bulk sync answer over everything not changed locally since
    /// the pushed snapshot was taken (generation `watermark` onwards).
    ///
    /// Those newer changes stay as they are in the store and the cache, and
    /// keep their retries. Returns how many ids were kept.
    fn adopt(&self, state: RemoteState, watermark: u64) -> usize {
        let generations = self.generations();
        let newer: HashSet<String> = generations
            .iter()
            .filter(|(_, generation)| **generation >= watermark)
            .map(|(id, _)| id.clone())
            .collect();

        let adopted: Vec<Item> = state
            .items
            .iter()
            .filter(|item| !newer.contains(&item.id))
            .map(Item::as_clean)
            .collect();
        let local: Vec<Item> = self
            .store
            .snapshot()
            .into_iter()
            .filter(|item| newer.contains(&item.id))
            .collect();
        let pending_delete = newer
            .iter()
            .any(|id| !local.iter().any(|item| &item.id == id));

        let dropped = self.retries.cancel_items_except(&newer);
        if dropped > 0 {
            debug!("bulk sync replaced {} pending item retries", dropped);
        }
        self.store
            .reset(adopted.iter().chain(local.iter()).cloned().collect());
        self.persist_reconciled(&adopted, &newer, &local, state.revision, pending_delete);
        drop(generations);
        newer.len()
    }

    fn needs_sync(&self, fetched_revision: i64) -> bool {
        let cache = self.cache();
        let dirty = cache.has_dirty_items().unwrap_or_else(|e| {
            warn!("failed to read dirty items: {}", e);
            true
        });
        let tombstones = cache.has_tombstones().unwrap_or_else(|e| {
            warn!("failed to read tombstone flag: {}", e);
            true
        });
        let stale = cache
            .revision()
            .map(|local| local != fetched_revision)
            .unwrap_or(true);
        debug!(
            "sync check: dirty={} tombstones={} stale={}",
            dirty, tombstones, stale
        );
        dirty || tombstones || stale
    }

    fn schedule_retry(self: &Arc<Self>, step: Step, attempt: u32) {
        let key = step.key();
        if !self.policy.allows(attempt) {
            warn!("giving up on {} after {} attempts", key, attempt + 1);
            return;
        }
        let delay = self.policy.delay(attempt);
        debug!("retrying {} in {:?} (attempt {})", key, delay, attempt);
        let task = Arc::clone(self).run_step(step, attempt + 1);
        self.retries.schedule(
            RetryInfo {
                key,
                attempt,
                delay,
            },
            task,
        );
    }

    /// Replaces pending work with a bulk sync after a rejected request.
    fn escalate(self: &Arc<Self>) {
        self.retries.cancel(&RetryKey::Reconcile);
        tokio::spawn(Arc::clone(self).run_bulk_sync(0));
    }

    /// Records a revision from a single-item call, never moving backwards.
    fn advance_revision(&self, revision: i64) {
        let mut cache = self.cache();
        let result = cache.revision().and_then(|current| {
            if revision > current {
                cache.set_revision(revision)
            } else {
                Ok(())
            }
        });
        if let Err(e) = result {
            warn!("failed to store revision {}: {}", revision, e);
        }
    }

    /// Whether the store still holds the item `mutation` wrote.
    fn holds(&self, mutation: &Mutation) -> bool {
        self.store.get(mutation.id()).is_some()
    }

    fn persist_accepted(&self, mutation: &Mutation) {
        let held = self.holds(mutation);
        let mut cache = self.cache();
        let result = match mutation {
            Mutation::Add(item) | Mutation::Update(item) => {
                save(&mut *cache, &item.as_clean(), held)
            }
            Mutation::Delete(id) => forget(&mut *cache, id),
        };
        if let Err(e) = result {
            warn!("failed to persist {} of {}: {}", mutation.name(), mutation.id(), e);
        }
    }

    fn persist_deferred(&self, mutation: &Mutation) {
        let held = self.holds(mutation);
        let mut cache = self.cache();
        let result = match mutation {
            Mutation::Add(item) | Mutation::Update(item) => {
                save(&mut *cache, &item.as_dirty(), held)
            }
            Mutation::Delete(id) => cache
                .set_has_tombstones(true)
                .and_then(|()| forget(&mut *cache, id)),
        };
        if let Err(e) = result {
            warn!(
                "failed to record pending {} of {}: {}",
                mutation.name(),
                mutation.id(),
                e
            );
        }
    }

    /// Rewrites the cache from a bulk sync answer.
    ///
    /// Rows for `newer` ids keep their cached state (dirty flag included);
    /// their own completions settle them. `local` stands in, marked dirty,
    /// when the cache cannot be read.
    fn persist_reconciled(
        &self,
        adopted: &[Item],
        newer: &HashSet<String>,
        local: &[Item],
        revision: i64,
        pending_delete: bool,
    ) {
        let mut cache = self.cache();
        let kept = if newer.is_empty() {
            Vec::new()
        } else {
            match cache.load_all() {
                Ok(rows) => rows
                    .into_iter()
                    .filter(|row| newer.contains(&row.id))
                    .collect(),
                Err(e) => {
                    warn!("failed to read cached rows, keeping local copies dirty: {}", e);
                    local.iter().map(Item::as_dirty).collect()
                }
            }
        };
        let rows: Vec<Item> = adopted.iter().chain(kept.iter()).cloned().collect();
        let result = cache
            .reload_all(&rows)
            .and_then(|()| cache.set_revision(revision))
            .and_then(|()| {
                if pending_delete {
                    Ok(())
                } else {
                    cache.set_has_tombstones(false)
                }
            });
        if let Err(e) = result {
            warn!("failed to persist reconciled state: {}", e);
        }
    }
}

/// Writes `item` to the cache. A missing row is only created when `create`
/// is set; otherwise the write is dropped.
fn save<C: LocalCache + ?Sized>(cache: &mut C, item: &Item, create: bool) -> td_core::Result<()> {
    match cache.update(item) {
        Err(Error::UnknownId(_)) if create => cache.add(item),
        Err(Error::UnknownId(_)) => Ok(()),
        other => other,
    }
}

/// Removes `id` from the cache; an absent id is not an error.
fn forget<C: LocalCache + ?Sized>(cache: &mut C, id: &str) -> td_core::Result<()> {
    match cache.delete(id) {
        Err(Error::UnknownId(_)) => Ok(()),
        other => other,
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
