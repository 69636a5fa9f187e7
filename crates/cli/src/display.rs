// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, NaiveDate};
use td_core::{Importance, Item};

use crate::error::{Error, Result};

/// Number of id characters shown in listings.
pub const SHORT_ID_LEN: usize = 8;

pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Parses a `YYYY-MM-DD` deadline into seconds since the epoch (midnight UTC).
pub fn parse_deadline(s: &str) -> Result<i64> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().timestamp())
        .ok_or_else(|| Error::InvalidDeadline(s.to_string()))
}

pub fn format_date(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Format an item as a single line for list output.
///
/// `*` after the id marks an item the remote has not acknowledged.
pub fn format_item_line(item: &Item) -> String {
    let check = if item.is_done { "x" } else { " " };
    let dirty = if item.is_dirty { "*" } else { "" };
    let mut line = format!("- [{}] {}{}", check, short_id(&item.id), dirty);
    if item.importance != Importance::Normal {
        line.push_str(&format!(" ({})", item.importance));
    }
    line.push_str(&format!(": {}", item.text));
    if let Some(deadline) = item.deadline {
        line.push_str(&format!(" (due {})", format_date(deadline)));
    }
    line
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
