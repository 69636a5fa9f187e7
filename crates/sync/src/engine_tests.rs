// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::remote::{RemoteError, RemoteState};
use crate::test_helpers::{
    network_down, seeded_cache, settle, Call, MockRemote, RecordingListener, UnreadableCache,
};
use std::time::Duration;
use td_core::SqliteCache;
use yare::parameterized;

type Engine = SyncEngine<SqliteCache, MockRemote>;

fn item(id: &str, text: &str) -> Item {
    Item::with_id(id, text, 1_000)
}

fn engine(remote: &MockRemote) -> Engine {
    SyncEngine::new(
        SqliteCache::open_in_memory().unwrap(),
        remote.clone(),
        BackoffPolicy::default(),
    )
}

fn cached(engine: &Engine) -> Vec<Item> {
    engine.inner.cache().load_all().unwrap()
}

fn cached_revision(engine: &Engine) -> i64 {
    engine.inner.cache().revision().unwrap()
}

fn has_tombstones(engine: &Engine) -> bool {
    engine.inner.cache().has_tombstones().unwrap()
}

#[tokio::test]
async fn add_success_persists_clean_item_and_revision() {
    let remote = MockRemote::new(0);
    remote.script_mutation(Ok(7));
    let engine = engine(&remote);

    engine.add(item("a", "buy milk")).wait().await;

    let items = engine.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "a");
    assert_eq!(cached_revision(&engine), 7);
    let stored = cached(&engine);
    assert_eq!(stored.len(), 1);
    assert!(!stored[0].is_dirty);
    assert_eq!(remote.calls(), vec![Call::Add { id: "a".into(), known: 0 }]);
}

#[tokio::test]
async fn add_is_visible_before_remote_answers() {
    let remote = MockRemote::gated(0);
    let engine = engine(&remote);

    let handle = engine.add(item("a", "buy milk"));
    settle().await;

    assert_eq!(engine.items().len(), 1);
    assert!(cached(&engine).is_empty());

    remote.release(1);
    handle.wait().await;
    assert_eq!(cached(&engine).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn add_failure_marks_dirty_and_schedules_retry() {
    let remote = MockRemote::new(0);
    remote.script_mutation(Err(network_down()));
    let engine = engine(&remote);

    engine.add(item("a", "buy milk")).wait().await;

    assert_eq!(engine.items().len(), 1);
    let stored = cached(&engine);
    assert_eq!(stored.len(), 1);
    assert!(stored[0].is_dirty);
    assert_eq!(cached_revision(&engine), 0);

    let pending = engine.pending_retries();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].key, RetryKey::Item("a".into()));
    assert_eq!(pending[0].attempt, 0);
    assert!(pending[0].delay >= Duration::from_millis(1_900));
    assert!(pending[0].delay <= Duration::from_millis(2_100));
}

#[tokio::test(start_paused = true)]
async fn retry_clears_dirty_flag_once_remote_recovers() {
    let remote = MockRemote::new(0);
    remote.script_mutation(Err(network_down()));
    let engine = engine(&remote);

    engine.add(item("a", "buy milk")).wait().await;
    assert!(cached(&engine)[0].is_dirty);

    tokio::time::sleep(Duration::from_secs(3)).await;
    settle().await;

    assert!(!cached(&engine)[0].is_dirty);
    assert_eq!(cached_revision(&engine), 1);
    assert!(engine.pending_retries().is_empty());
    assert_eq!(
        remote.calls(),
        vec![
            Call::Add { id: "a".into(), known: 0 },
            Call::Add { id: "a".into(), known: 0 },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn retries_back_off_until_cap() {
    let remote = MockRemote::new(0);
    for _ in 0..3 {
        remote.script_mutation(Err(RemoteError::ServerError("503".into())));
    }
    let engine = engine(&remote);

    engine.add(item("a", "x")).wait().await;
    let first = engine.pending_retries()[0].clone();

    tokio::time::sleep(first.delay + Duration::from_millis(1)).await;
    settle().await;
    let second = engine.pending_retries()[0].clone();

    assert_eq!(first.attempt, 0);
    assert_eq!(second.attempt, 1);
    assert!(second.delay >= Duration::from_millis(2_850));
    assert!(second.delay <= Duration::from_millis(3_150));
}

#[tokio::test(start_paused = true)]
async fn abandoned_retry_leaves_item_dirty() {
    let remote = MockRemote::new(0);
    remote.script_mutation(Err(network_down()));
    remote.script_mutation(Err(network_down()));
    let policy = BackoffPolicy {
        max_attempts: Some(1),
        ..BackoffPolicy::default()
    };
    let engine = SyncEngine::new(
        SqliteCache::open_in_memory().unwrap(),
        remote.clone(),
        policy,
    );

    engine.add(item("a", "x")).wait().await;
    tokio::time::sleep(Duration::from_secs(3)).await;
    settle().await;

    assert!(engine.pending_retries().is_empty());
    assert!(cached(&engine)[0].is_dirty);
    assert_eq!(remote.calls().len(), 2);
}

#[tokio::test]
async fn update_success_overwrites_cached_item() {
    let remote = MockRemote::new(4);
    let engine = SyncEngine::new(
        seeded_cache(&[item("a", "old")], 4, false),
        remote.clone(),
        BackoffPolicy::default(),
    );
    engine.load().wait().await;

    engine.update(item("a", "new").touched()).wait().await;

    assert_eq!(engine.items()[0].text, "new");
    let stored = cached(&engine);
    assert_eq!(stored[0].text, "new");
    assert!(!stored[0].is_dirty);
    assert_eq!(cached_revision(&engine), 5);
}

#[tokio::test(start_paused = true)]
async fn update_failure_marks_dirty() {
    let remote = MockRemote::new(4);
    let engine = SyncEngine::new(
        seeded_cache(&[item("a", "old")], 4, false),
        remote.clone(),
        BackoffPolicy::default(),
    );
    engine.load().wait().await;
    remote.script_mutation(Err(network_down()));

    engine.update(item("a", "new")).wait().await;

    let stored = cached(&engine);
    assert_eq!(stored[0].text, "new");
    assert!(stored[0].is_dirty);
    assert_eq!(engine.pending_retries().len(), 1);
}

#[tokio::test]
async fn delete_success_removes_from_cache() {
    let remote = MockRemote::new(2);
    let engine = SyncEngine::new(
        seeded_cache(&[item("a", "x"), item("b", "y")], 2, false),
        remote.clone(),
        BackoffPolicy::default(),
    );
    engine.load().wait().await;

    engine.delete("a").wait().await;

    assert_eq!(engine.items().len(), 1);
    let stored = cached(&engine);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, "b");
    assert!(!has_tombstones(&engine));
    assert_eq!(cached_revision(&engine), 3);
}

#[tokio::test(start_paused = true)]
async fn delete_failure_sets_tombstones_until_bulk_sync() {
    let remote = MockRemote::new(2);
    let engine = SyncEngine::new(
        seeded_cache(&[item("a", "x")], 2, false),
        remote.clone(),
        BackoffPolicy::default(),
    );
    engine.load().wait().await;
    remote.script_mutation(Err(network_down()));

    engine.delete("a").wait().await;

    assert!(engine.items().is_empty());
    assert!(has_tombstones(&engine));
    assert!(cached(&engine).is_empty());

    engine.sync().wait().await;

    assert!(!has_tombstones(&engine));
    assert!(engine.pending_retries().is_empty());
}

#[tokio::test]
async fn duplicate_add_keeps_ids_unique() {
    let remote = MockRemote::new(0);
    let engine = engine(&remote);

    engine.add(item("a", "first")).wait().await;
    engine.add(item("a", "second")).wait().await;

    assert_eq!(engine.items().len(), 1);
    assert_eq!(engine.items()[0].text, "first");
    let stored = cached(&engine);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].text, "first");
    assert_eq!(remote.calls(), vec![Call::Add { id: "a".into(), known: 0 }]);
}

#[parameterized(
    accepted = { None },
    deferred = { Some(network_down()) },
)]
#[test_macro(tokio::test)]
async fn update_of_absent_item_leaves_cache_alone(failure: Option<RemoteError>) {
    let remote = MockRemote::new(0);
    if let Some(e) = failure {
        remote.script_mutation(Err(e));
    }
    let engine = engine(&remote);

    engine.update(item("ghost", "x")).wait().await;

    assert!(engine.items().is_empty());
    assert!(cached(&engine).is_empty());
    engine.shutdown();
}

#[tokio::test]
async fn add_during_startup_check_is_pushed() {
    let remote = MockRemote::gated(5);
    let engine = SyncEngine::new(
        seeded_cache(&[item("a", "x")], 4, false),
        remote.clone(),
        BackoffPolicy::default(),
    );

    let load = engine.load();
    settle().await;
    let add = engine.add(item("b", "y"));
    settle().await;
    remote.release(3);
    load.wait().await;
    add.wait().await;

    assert!(remote
        .calls()
        .iter()
        .any(|call| matches!(call, Call::BulkSync { ids, .. } if ids == &["a", "b"])));
    let ids: Vec<String> = engine.items().into_iter().map(|i| i.id).collect();
    assert_eq!(ids, vec!["a", "b"]);
    let stored = cached(&engine);
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|i| !i.is_dirty));
}

#[tokio::test]
async fn add_during_bulk_sync_survives_adoption() {
    let remote = MockRemote::gated(0);
    let engine = engine(&remote);

    let bulk = engine.sync();
    settle().await;
    remote.script_mutation(Err(network_down()));
    let add = engine.add(item("x", "new"));
    settle().await;
    remote.release(2);
    bulk.wait().await;
    add.wait().await;

    assert_eq!(
        remote.calls()[0],
        Call::BulkSync {
            ids: vec![],
            known: 0
        }
    );
    let items = engine.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "x");
    let stored = cached(&engine);
    assert_eq!(stored.len(), 1);
    assert!(stored[0].is_dirty);
    assert_eq!(
        engine.pending_retries()[0].key,
        RetryKey::Item("x".into())
    );
    engine.shutdown();
}

#[tokio::test]
async fn delete_during_bulk_sync_keeps_tombstones() {
    let remote = MockRemote::gated(2);
    let engine = SyncEngine::new(
        seeded_cache(&[item("a", "x")], 2, false),
        remote.clone(),
        BackoffPolicy::default(),
    );
    let load = engine.load();
    remote.release(1);
    load.wait().await;

    let bulk = engine.sync();
    settle().await;
    remote.script_mutation(Err(network_down()));
    let delete = engine.delete("a");
    settle().await;
    remote.release(2);
    bulk.wait().await;
    delete.wait().await;

    assert!(engine.items().is_empty());
    assert!(cached(&engine).is_empty());
    assert!(has_tombstones(&engine));
    assert_eq!(cached_revision(&engine), 3);
    assert_eq!(engine.pending_retries().len(), 1);
    engine.shutdown();
}

#[tokio::test]
async fn known_revision_follows_previous_response() {
    let remote = MockRemote::new(0);
    remote.script_mutation(Ok(7));
    remote.script_mutation(Ok(8));
    let engine = engine(&remote);

    engine.add(item("a", "x")).wait().await;
    engine.add(item("b", "y")).wait().await;

    assert_eq!(
        remote.calls(),
        vec![
            Call::Add { id: "a".into(), known: 0 },
            Call::Add { id: "b".into(), known: 7 },
        ]
    );
    assert_eq!(cached_revision(&engine), 8);
}

#[tokio::test]
async fn older_revision_does_not_move_cache_backwards() {
    let remote = MockRemote::new(0);
    remote.script_mutation(Ok(9));
    remote.script_mutation(Ok(6));
    let engine = engine(&remote);

    engine.add(item("a", "x")).wait().await;
    engine.add(item("b", "y")).wait().await;

    assert_eq!(cached_revision(&engine), 9);
}

#[parameterized(
    up_to_date = { false, false, 3, 0 },
    dirty_items = { true, false, 3, 1 },
    tombstones = { false, true, 3, 1 },
    revision_mismatch = { false, false, 4, 1 },
)]
#[test_macro(tokio::test)]
async fn startup_reconciles_only_when_diverged(
    dirty: bool,
    tombstones: bool,
    fetched: i64,
    expected_bulk: usize,
) {
    let remote = MockRemote::new(fetched);
    let mut seed = item("a", "x");
    seed.is_dirty = dirty;
    let engine = SyncEngine::new(
        seeded_cache(&[seed], 3, tombstones),
        remote.clone(),
        BackoffPolicy::default(),
    );

    engine.load().wait().await;

    assert_eq!(remote.bulk_calls(), expected_bulk);
    assert_eq!(remote.calls()[0], Call::FetchAll);
}

#[tokio::test]
async fn startup_reconciliation_adopts_remote_state() {
    let remote = MockRemote::new(3);
    remote.script_bulk(Ok(RemoteState {
        items: vec![item("a", "from server"), item("z", "other device")],
        revision: 9,
    }));
    let engine = SyncEngine::new(
        seeded_cache(&[item("a", "local").as_dirty()], 3, true),
        remote.clone(),
        BackoffPolicy::default(),
    );

    let handle = engine.load();
    assert_eq!(engine.items()[0].text, "local");
    handle.wait().await;

    assert_eq!(
        remote.calls(),
        vec![
            Call::FetchAll,
            Call::BulkSync {
                ids: vec!["a".into()],
                known: 3
            },
        ]
    );
    let texts: Vec<String> = engine.items().into_iter().map(|i| i.text).collect();
    assert_eq!(texts, vec!["from server", "other device"]);
    assert_eq!(cached_revision(&engine), 9);
    assert!(!has_tombstones(&engine));
    assert!(cached(&engine).iter().all(|i| !i.is_dirty));
}

#[tokio::test]
async fn unreadable_cache_starts_empty_and_bulk_syncs() {
    let remote = MockRemote::new(5);
    remote.script_bulk(Ok(RemoteState {
        items: vec![item("r", "remote")],
        revision: 6,
    }));
    let cache = UnreadableCache(seeded_cache(&[], 5, false));
    let engine = SyncEngine::new(cache, remote.clone(), BackoffPolicy::default());

    let handle = engine.load();
    assert!(engine.items().is_empty());
    handle.wait().await;

    assert_eq!(remote.bulk_calls(), 1);
    assert_eq!(engine.items()[0].id, "r");
}

#[tokio::test(start_paused = true)]
async fn failed_revision_check_is_retried() {
    let remote = MockRemote::new(3);
    remote.script_fetch(Err(network_down()));
    let engine = SyncEngine::new(
        seeded_cache(&[item("a", "x").as_dirty()], 3, false),
        remote.clone(),
        BackoffPolicy::default(),
    );

    engine.load().wait().await;
    assert_eq!(engine.pending_retries()[0].key, RetryKey::Reconcile);
    assert_eq!(remote.bulk_calls(), 0);

    tokio::time::sleep(Duration::from_secs(3)).await;
    settle().await;

    assert_eq!(remote.bulk_calls(), 1);
    assert!(engine.pending_retries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_bulk_sync_is_retried() {
    let remote = MockRemote::new(0);
    remote.script_bulk(Err(RemoteError::ServerError("500".into())));
    let engine = engine(&remote);

    engine.sync().wait().await;
    assert_eq!(engine.pending_retries()[0].key, RetryKey::Reconcile);

    tokio::time::sleep(Duration::from_secs(3)).await;
    settle().await;

    assert_eq!(remote.bulk_calls(), 2);
    assert!(engine.pending_retries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn new_mutation_supersedes_pending_retry() {
    let remote = MockRemote::new(0);
    remote.script_mutation(Err(network_down()));
    let engine = engine(&remote);

    engine.add(item("a", "x")).wait().await;
    assert_eq!(engine.pending_retries().len(), 1);

    engine.delete("a").wait().await;
    assert!(engine.pending_retries().is_empty());

    tokio::time::sleep(Duration::from_secs(10)).await;
    settle().await;

    assert_eq!(
        remote.calls(),
        vec![
            Call::Add { id: "a".into(), known: 0 },
            Call::Delete { id: "a".into(), known: 0 },
        ]
    );
    assert!(cached(&engine).is_empty());
}

#[tokio::test]
async fn superseded_completion_does_not_overwrite_cache() {
    let remote = MockRemote::gated(0);
    let engine = engine(&remote);
    remote.release(1);
    engine.add(item("a", "v0")).wait().await;

    let first = engine.update(item("a", "v1"));
    let second = engine.update(item("a", "v2"));
    settle().await;
    remote.release(2);
    first.wait().await;
    second.wait().await;

    assert_eq!(cached(&engine)[0].text, "v2");
    assert_eq!(engine.items()[0].text, "v2");
    assert_eq!(cached_revision(&engine), 3);
}

#[tokio::test]
async fn rejected_mutation_escalates_to_bulk_sync() {
    let remote = MockRemote::new(0);
    remote.script_mutation(Err(RemoteError::InvalidRequest("unsynchronized data".into())));
    let engine = engine(&remote);

    engine.add(item("a", "x")).wait().await;
    assert!(engine.pending_retries().is_empty());
    settle().await;

    assert_eq!(remote.bulk_calls(), 1);
    assert!(cached(&engine).iter().all(|i| !i.is_dirty));
    assert_eq!(cached_revision(&engine), 1);
}

#[tokio::test(start_paused = true)]
async fn bulk_sync_cancels_item_retries() {
    let remote = MockRemote::new(0);
    remote.script_mutation(Err(network_down()));
    remote.script_mutation(Err(network_down()));
    let engine = engine(&remote);

    engine.add(item("a", "x")).wait().await;
    engine.add(item("b", "y")).wait().await;
    assert_eq!(engine.pending_retries().len(), 2);

    engine.sync().wait().await;

    assert!(engine.pending_retries().is_empty());
    assert_eq!(cached(&engine).len(), 2);
    assert!(cached(&engine).iter().all(|i| !i.is_dirty));
}

#[tokio::test]
async fn requests_are_bracketed_even_on_failure() {
    let remote = MockRemote::new(0);
    remote.script_mutation(Err(RemoteError::AuthRejected));
    remote.script_bulk(Err(network_down()));
    let listener = Arc::new(RecordingListener::default());
    let engine = SyncEngine::with_listener(
        SqliteCache::open_in_memory().unwrap(),
        remote.clone(),
        BackoffPolicy::default(),
        listener.clone(),
    );

    engine.add(item("a", "x")).wait().await;
    settle().await;

    assert_eq!(remote.calls().len(), 2);
    assert_eq!(listener.count(SyncEvent::RequestStarted), 2);
    assert_eq!(listener.count(SyncEvent::RequestEnded), 2);
    assert_eq!(listener.events()[0], SyncEvent::ItemsChanged);
    engine.shutdown();
}

#[tokio::test]
async fn store_mutations_notify_items_changed() {
    let remote = MockRemote::new(0);
    let listener = Arc::new(RecordingListener::default());
    let engine = SyncEngine::with_listener(
        SqliteCache::open_in_memory().unwrap(),
        remote.clone(),
        BackoffPolicy::default(),
        listener.clone(),
    );

    engine.add(item("a", "x")).wait().await;
    engine.update(item("a", "y")).wait().await;
    engine.delete("a").wait().await;
    settle().await;

    assert_eq!(listener.count(SyncEvent::ItemsChanged), 3);
    assert_eq!(
        &listener.events()[..3],
        &[
            SyncEvent::ItemsChanged,
            SyncEvent::RequestStarted,
            SyncEvent::RequestEnded
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_drops_pending_retries() {
    let remote = MockRemote::new(0);
    remote.script_mutation(Err(network_down()));
    let engine = engine(&remote);

    engine.add(item("a", "x")).wait().await;
    engine.shutdown();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert!(engine.pending_retries().is_empty());
    assert_eq!(remote.calls().len(), 1);
    assert!(cached(&engine)[0].is_dirty);
}

#[tokio::test(start_paused = true)]
async fn status_reports_bookkeeping() {
    let remote = MockRemote::new(0);
    remote.script_mutation(Ok(4));
    remote.script_mutation(Err(network_down()));
    let engine = engine(&remote);

    engine.add(item("a", "x")).wait().await;
    engine.add(item("b", "y")).wait().await;

    assert_eq!(
        engine.status().unwrap(),
        SyncStatus {
            items: 2,
            revision: 4,
            dirty_items: 1,
            has_tombstones: false,
            pending_retries: 1,
        }
    );
}
