// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Change and activity notifications for a UI collaborator.
//!
//! Events are queued on a channel and delivered to the listener from a
//! single dispatch task, so listener callbacks never run concurrently and
//! arrive in the order the engine emitted them.

use std::sync::Arc;

use tokio::sync::mpsc;

/// A notification emitted by the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    /// The item store changed.
    ItemsChanged,
    /// A remote call was issued.
    RequestStarted,
    /// A remote call completed, successfully or not.
    RequestEnded,
}

/// Receiver of engine notifications.
pub trait SyncListener: Send + Sync + 'static {
    fn items_changed(&self) {}

    fn request_started(&self) {}

    fn request_ended(&self) {}
}

fn dispatch(listener: &dyn SyncListener, event: SyncEvent) {
    match event {
        SyncEvent::ItemsChanged => listener.items_changed(),
        SyncEvent::RequestStarted => listener.request_started(),
        SyncEvent::RequestEnded => listener.request_ended(),
    }
}

/// Sending half of the notification channel.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    tx: Option<mpsc::UnboundedSender<SyncEvent>>,
}

impl Notifier {
    /// A notifier that drops every event.
    pub fn disabled() -> Self {
        Notifier { tx: None }
    }

    /// Spawns the dispatch task for `listener`.
    ///
    /// Must be called from within a tokio runtime. The task exits once every
    /// clone of the returned notifier is dropped.
    pub fn spawn(listener: Arc<dyn SyncListener>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                dispatch(listener.as_ref(), event);
            }
        });
        Notifier { tx: Some(tx) }
    }

    pub fn notify(&self, event: SyncEvent) {
        if let Some(tx) = &self.tx {
            // Closed only when the dispatch task is gone; nothing left to tell.
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
