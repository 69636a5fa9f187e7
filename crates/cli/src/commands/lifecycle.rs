// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::display::short_id;
use crate::error::{Error, Result};

use super::{resolve_ids, Session};

pub async fn done(session: &Session, ids: &[String]) -> Result<()> {
    set_done(session, ids, true).await
}

pub async fn reopen(session: &Session, ids: &[String]) -> Result<()> {
    set_done(session, ids, false).await
}

async fn set_done(session: &Session, ids: &[String], done: bool) -> Result<()> {
    let ids = resolve_ids(&session.engine.items(), ids)?;

    let mut handles = Vec::new();
    for id in &ids {
        let item = session
            .engine
            .get(id)
            .ok_or_else(|| Error::ItemNotFound(id.clone()))?;
        if item.is_done == done {
            let state = if done { "done" } else { "open" };
            println!("{} is already {}", short_id(id), state);
            continue;
        }

        let mut item = item.touched();
        item.is_done = done;
        handles.push(session.engine.update(item));
        let verb = if done { "Completed" } else { "Reopened" };
        println!("{} {}", verb, short_id(id));
    }

    for handle in handles {
        handle.wait().await;
    }
    for id in &ids {
        session.report_deferred(id);
    }
    Ok(())
}

pub async fn remove(session: &Session, ids: &[String]) -> Result<()> {
    let ids = resolve_ids(&session.engine.items(), ids)?;

    let handles: Vec<_> = ids.iter().map(|id| session.engine.delete(id)).collect();
    for id in &ids {
        println!("Deleted {}", short_id(id));
    }

    for handle in handles {
        handle.wait().await;
    }
    for id in &ids {
        session.report_deferred(id);
    }
    Ok(())
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
