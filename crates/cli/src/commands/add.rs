// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use td_core::Item;

use crate::cli::ItemFields;
use crate::display::{parse_deadline, short_id};
use crate::error::Result;

use super::Session;

pub async fn run(session: &Session, text: &str, fields: &ItemFields) -> Result<String> {
    let mut item = Item::new(text.trim());
    if let Some(importance) = fields.importance {
        item.importance = importance;
    }
    if let Some(deadline) = &fields.deadline {
        item.deadline = Some(parse_deadline(deadline)?);
    }

    let id = item.id.clone();
    session.engine.add(item).wait().await;

    println!("Added {}: {}", short_id(&id), text.trim());
    session.report_deferred(&id);
    Ok(id)
}

#[cfg(test)]
#[path = "add_tests.rs"]
mod tests;
