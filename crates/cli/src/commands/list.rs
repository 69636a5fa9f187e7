// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use td_core::Item;

use crate::cli::OutputFormat;
use crate::display::format_item_line;
use crate::error::Result;

use super::Session;

/// Items to show, in store order.
pub(crate) fn visible_items(items: Vec<Item>, pending_only: bool) -> Vec<Item> {
    items
        .into_iter()
        .filter(|item| !pending_only || !item.is_done)
        .collect()
}

pub fn run(session: &Session, pending_only: bool, output: OutputFormat) -> Result<()> {
    let items = visible_items(session.engine.items(), pending_only);

    match output {
        OutputFormat::Text => {
            for item in &items {
                println!("{}", format_item_line(item));
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod tests;
