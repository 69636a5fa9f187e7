// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Core item types for the td task list.
//!
//! An [`Item`] is a single task record. Timestamps are whole seconds since
//! the Unix epoch so they survive storage and wire encoding unchanged.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Priority of an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Low,
    #[default]
    Normal,
    High,
}

impl Importance {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::Low => "low",
            Importance::Normal => "normal",
            Importance::High => "high",
        }
    }
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Importance {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Importance::Low),
            "normal" => Ok(Importance::Normal),
            "high" => Ok(Importance::High),
            _ => Err(Error::InvalidImportance(s.to_string())),
        }
    }
}

/// A task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique, immutable identifier.
    pub id: String,
    /// Free-form content.
    pub text: String,
    pub importance: Importance,
    pub is_done: bool,
    /// Creation time in seconds since the epoch. Immutable.
    pub created_at: i64,
    /// Last modification time in seconds since the epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<i64>,
    /// True while the remote has not acknowledged the latest local state.
    #[serde(default)]
    pub is_dirty: bool,
}

impl Item {
    /// Creates a new item with a random id, stamped with the current time.
    pub fn new(text: impl Into<String>) -> Self {
        Item::with_id(uuid::Uuid::new_v4().to_string(), text, now())
    }

    /// Creates an item with an explicit id and creation time.
    pub fn with_id(id: impl Into<String>, text: impl Into<String>, created_at: i64) -> Self {
        Item {
            id: id.into(),
            text: text.into(),
            importance: Importance::Normal,
            is_done: false,
            created_at,
            changed_at: None,
            deadline: None,
            is_dirty: false,
        }
    }

    /// Returns a copy with `changed_at` set to the current time.
    pub fn touched(&self) -> Self {
        Item {
            changed_at: Some(now()),
            ..self.clone()
        }
    }

    /// Returns a copy flagged as not yet acknowledged by the remote.
    pub fn as_dirty(&self) -> Self {
        Item {
            is_dirty: true,
            ..self.clone()
        }
    }

    /// Returns a copy flagged as acknowledged by the remote.
    pub fn as_clean(&self) -> Self {
        Item {
            is_dirty: false,
            ..self.clone()
        }
    }

    /// The modification time, falling back to the creation time.
    pub fn last_changed(&self) -> i64 {
        self.changed_at.unwrap_or(self.created_at)
    }
}

/// Current time in seconds since the epoch.
pub fn now() -> i64 {
    Utc::now().timestamp()
}

#[cfg(test)]
#[path = "item_tests.rs"]
mod tests;
