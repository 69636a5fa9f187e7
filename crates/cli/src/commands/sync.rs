// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use td_sync::RetryKey;

use crate::error::{Error, Result};

use super::{RemoteMode, Session};

pub async fn run(session: &Session, config_path: &Path) -> Result<()> {
    match session.mode {
        RemoteMode::Remote(_) => {}
        RemoteMode::LocalOnly => {
            return Err(Error::NoRemote(config_path.display().to_string()));
        }
        RemoteMode::Offline => {
            return Err(Error::SyncDeferred("--offline was given".to_string()));
        }
    }

    session.engine.sync().wait().await;

    let deferred = session
        .engine
        .pending_retries()
        .iter()
        .any(|retry| retry.key == RetryKey::Reconcile);
    if deferred {
        return Err(Error::SyncDeferred("the remote did not complete the sync, see td.log".to_string()));
    }

    let status = session.engine.status()?;
    println!(
        "Synced {} items at revision {}",
        status.items, status.revision
    );
    Ok(())
}
