// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::Result;

use super::{RemoteMode, Session};

/// JSON output structure for the status command.
#[derive(Debug, Serialize)]
struct StatusJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    remote: Option<String>,
    mode: &'static str,
    revision: i64,
    items: usize,
    unsynced_items: usize,
    pending_deletions: bool,
}

fn mode_name(mode: &RemoteMode) -> &'static str {
    match mode {
        RemoteMode::Remote(_) => "remote",
        RemoteMode::LocalOnly => "local",
        RemoteMode::Offline => "offline",
    }
}

pub fn run(session: &Session, output: OutputFormat) -> Result<()> {
    let status = session.engine.status()?;
    let remote = match &session.mode {
        RemoteMode::Remote(url) => Some(url.clone()),
        _ => None,
    };

    match output {
        OutputFormat::Text => {
            match &remote {
                Some(url) => println!("remote: {}", url),
                None if session.mode == RemoteMode::Offline => println!("remote: offline"),
                None => println!("remote: none (local only)"),
            }
            println!("revision: {}", status.revision);
            println!("items: {}", status.items);
            println!("unsynced items: {}", status.dirty_items);
            println!(
                "pending deletions: {}",
                if status.has_tombstones { "yes" } else { "no" }
            );
        }
        OutputFormat::Json => {
            let json = StatusJson {
                remote,
                mode: mode_name(&session.mode),
                revision: status.revision,
                items: status.items,
                unsynced_items: status.dirty_items,
                pending_deletions: status.has_tombstones,
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }
    Ok(())
}
