// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory ordered collection of items.
//!
//! The [`ItemStore`] is the view consumers read from. Writers take an
//! exclusive lock, so readers always see a fully applied mutation.
//! Operations on an absent id are silent no-ops; each mutator reports
//! whether it changed anything.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::item::Item;

/// Thread-safe ordered list of items, unique by id.
#[derive(Debug, Default)]
pub struct ItemStore {
    items: RwLock<Vec<Item>>,
}

impl ItemStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Item>> {
        self.items.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Item>> {
        self.items.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Appends the item unless one with the same id is already present.
    ///
    /// Never overwrites an existing item.
    pub fn upsert_if_absent(&self, item: Item) -> bool {
        let mut items = self.write();
        if items.iter().any(|existing| existing.id == item.id) {
            return false;
        }
        items.push(item);
        true
    }

    /// Overwrites the item with the same id in place.
    pub fn replace(&self, item: Item) -> bool {
        let mut items = self.write();
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }

    /// Removes the item with the given id.
    pub fn remove(&self, id: &str) -> bool {
        let mut items = self.write();
        let before = items.len();
        items.retain(|existing| existing.id != id);
        items.len() != before
    }

    /// Replaces the whole collection.
    ///
    /// Later duplicates of an id are dropped so the uniqueness invariant
    /// holds even for a malformed input list.
    pub fn reset(&self, new_items: Vec<Item>) {
        let mut deduped: Vec<Item> = Vec::with_capacity(new_items.len());
        for item in new_items {
            if !deduped.iter().any(|existing| existing.id == item.id) {
                deduped.push(item);
            }
        }
        *self.write() = deduped;
    }

    /// Point-in-time copy of the current list.
    pub fn snapshot(&self) -> Vec<Item> {
        self.read().clone()
    }

    /// Looks up a single item by id.
    pub fn get(&self, id: &str) -> Option<Item> {
        self.read().iter().find(|item| item.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
