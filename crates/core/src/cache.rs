// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable item storage plus sync bookkeeping.
//!
//! [`LocalCache`] is the contract the sync engine depends on; [`SqliteCache`]
//! is the SQLite-backed implementation. Every mutating call commits before
//! it returns. Read failures surface as [`Error::StorageReadFailed`] and
//! write failures as [`Error::StorageWriteFailed`].

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::error::{Error, Result};
use crate::item::{Importance, Item};

/// Durable storage of items and sync metadata.
pub trait LocalCache: Send {
    /// Reads every persisted item in insertion order.
    fn load_all(&self) -> Result<Vec<Item>>;

    /// Persists a new item. Fails with [`Error::DuplicateId`] if the id exists.
    fn add(&mut self, item: &Item) -> Result<()>;

    /// Overwrites an item. Fails with [`Error::UnknownId`] if the id is absent.
    fn update(&mut self, item: &Item) -> Result<()>;

    /// Removes an item. Fails with [`Error::UnknownId`] if the id is absent.
    fn delete(&mut self, id: &str) -> Result<()>;

    /// Replaces the entire persisted set.
    fn reload_all(&mut self, items: &[Item]) -> Result<()>;

    /// Last server revision this cache observed.
    fn revision(&self) -> Result<i64>;

    fn set_revision(&mut self, revision: i64) -> Result<()>;

    /// Whether a local deletion is still unconfirmed by the remote.
    fn has_tombstones(&self) -> Result<bool>;

    fn set_has_tombstones(&mut self, value: bool) -> Result<()>;

    /// True iff any persisted item is dirty.
    fn has_dirty_items(&self) -> Result<bool>;

    /// Number of dirty items.
    fn dirty_count(&self) -> Result<usize>;
}

/// SQL schema for the item cache.
pub const SCHEMA: &str = r#"
-- Items in insertion order (rowid)
CREATE TABLE IF NOT EXISTS items (
    id TEXT PRIMARY KEY,
    text TEXT NOT NULL,
    importance TEXT NOT NULL DEFAULT 'normal',
    done INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    changed_at INTEGER,
    deadline INTEGER,
    dirty INTEGER NOT NULL DEFAULT 0
);

-- Sync metadata, kept apart from items
CREATE TABLE IF NOT EXISTS sync_meta (
    key TEXT PRIMARY KEY,
    value INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_dirty ON items(dirty);
"#;

const META_REVISION: &str = "revision";
const META_TOMBSTONES: &str = "has_tombstones";

const SELECT_ITEMS: &str = "SELECT id, text, importance, done, created_at, changed_at, deadline, dirty
     FROM items ORDER BY rowid";

/// Parse a string value from the database, returning a rusqlite error on parse failure.
fn parse_db<T: std::str::FromStr>(
    value: &str,
    column: &str,
) -> std::result::Result<T, rusqlite::Error> {
    value.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(Error::InvalidInput(format!(
                "invalid value '{value}' in column '{column}'"
            ))),
        )
    })
}

fn row_to_item(row: &rusqlite::Row<'_>) -> std::result::Result<Item, rusqlite::Error> {
    let importance: String = row.get(2)?;
    Ok(Item {
        id: row.get(0)?,
        text: row.get(1)?,
        importance: parse_db::<Importance>(&importance, "importance")?,
        is_done: row.get(3)?,
        created_at: row.get(4)?,
        changed_at: row.get(5)?,
        deadline: row.get(6)?,
        is_dirty: row.get(7)?,
    })
}

const INSERT_ITEM: &str = "INSERT INTO items (id, text, importance, done, created_at, changed_at, deadline, dirty)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

// Later duplicates lose, matching ItemStore::reset
const INSERT_ITEM_OR_IGNORE: &str = "INSERT OR IGNORE INTO items (id, text, importance, done, created_at, changed_at, deadline, dirty)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

fn insert_item(conn: &Connection, sql: &str, item: &Item) -> rusqlite::Result<usize> {
    conn.execute(
        sql,
        params![
            item.id,
            item.text,
            item.importance.as_str(),
            item.is_done,
            item.created_at,
            item.changed_at,
            item.deadline,
            item.is_dirty,
        ],
    )
}

/// Run schema creation on a cache connection.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA).map_err(Error::write)
}

/// SQLite-backed [`LocalCache`].
pub struct SqliteCache {
    conn: Connection,
}

impl SqliteCache {
    /// Open a cache at the given path, creating it if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(Error::write)?;
            }
        }

        let conn = Connection::open(path).map_err(Error::read)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = FULL;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(Error::write)?;

        run_migrations(&conn)?;
        tracing::debug!("opened item cache at {}", path.display());
        Ok(SqliteCache { conn })
    }

    /// Open an in-memory cache (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(Error::read)?;
        run_migrations(&conn)?;
        Ok(SqliteCache { conn })
    }

    fn exists(&self, id: &str) -> Result<bool> {
        self.conn
            .query_row("SELECT 1 FROM items WHERE id = ?1", params![id], |_| Ok(()))
            .optional()
            .map(|row| row.is_some())
            .map_err(Error::read)
    }

    fn meta(&self, key: &str) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT value FROM sync_meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(Error::read)
    }

    fn set_meta(&mut self, key: &str, value: i64) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sync_meta (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(Error::write)?;
        Ok(())
    }
}

impl LocalCache for SqliteCache {
    fn load_all(&self) -> Result<Vec<Item>> {
        let mut stmt = self.conn.prepare(SELECT_ITEMS).map_err(Error::read)?;
        let items = stmt
            .query_map([], row_to_item)
            .map_err(Error::read)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::read)?;
        Ok(items)
    }

    fn add(&mut self, item: &Item) -> Result<()> {
        if self.exists(&item.id)? {
            return Err(Error::DuplicateId(item.id.clone()));
        }
        insert_item(&self.conn, INSERT_ITEM, item).map_err(Error::write)?;
        Ok(())
    }

    fn update(&mut self, item: &Item) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE items SET text = ?2, importance = ?3, done = ?4, created_at = ?5,
                        changed_at = ?6, deadline = ?7, dirty = ?8
                 WHERE id = ?1",
                params![
                    item.id,
                    item.text,
                    item.importance.as_str(),
                    item.is_done,
                    item.created_at,
                    item.changed_at,
                    item.deadline,
                    item.is_dirty,
                ],
            )
            .map_err(Error::write)?;
        if changed == 0 {
            return Err(Error::UnknownId(item.id.clone()));
        }
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM items WHERE id = ?1", params![id])
            .map_err(Error::write)?;
        if changed == 0 {
            return Err(Error::UnknownId(id.to_string()));
        }
        Ok(())
    }

    fn reload_all(&mut self, items: &[Item]) -> Result<()> {
        let tx = self.conn.transaction().map_err(Error::write)?;
        tx.execute("DELETE FROM items", []).map_err(Error::write)?;
        for item in items {
            insert_item(&tx, INSERT_ITEM_OR_IGNORE, item).map_err(Error::write)?;
        }
        tx.commit().map_err(Error::write)?;
        tracing::debug!(items = items.len(), "reloaded item cache");
        Ok(())
    }

    fn revision(&self) -> Result<i64> {
        Ok(self.meta(META_REVISION)?.unwrap_or(0))
    }

    fn set_revision(&mut self, revision: i64) -> Result<()> {
        self.set_meta(META_REVISION, revision)
    }

    fn has_tombstones(&self) -> Result<bool> {
        Ok(self.meta(META_TOMBSTONES)?.unwrap_or(0) != 0)
    }

    fn set_has_tombstones(&mut self, value: bool) -> Result<()> {
        self.set_meta(META_TOMBSTONES, i64::from(value))
    }

    fn has_dirty_items(&self) -> Result<bool> {
        Ok(self.dirty_count()? > 0)
    }

    fn dirty_count(&self) -> Result<usize> {
        self.conn
            .query_row("SELECT COUNT(*) FROM items WHERE dirty = 1", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|count| usize::try_from(count).unwrap_or(0))
            .map_err(Error::read)
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
