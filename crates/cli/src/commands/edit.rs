// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::cli::ItemFields;
use crate::display::{parse_deadline, short_id};
use crate::error::{Error, Result};

use super::{resolve_id, Session};

pub async fn run(
    session: &Session,
    id: &str,
    text: Option<&str>,
    fields: &ItemFields,
    no_deadline: bool,
) -> Result<()> {
    if text.is_none() && fields.importance.is_none() && fields.deadline.is_none() && !no_deadline
    {
        return Err(Error::NothingToEdit);
    }

    let id = resolve_id(&session.engine.items(), id)?;
    let current = session
        .engine
        .get(&id)
        .ok_or_else(|| Error::ItemNotFound(id.clone()))?;

    let mut item = current.touched();
    if let Some(text) = text {
        item.text = text.trim().to_string();
    }
    if let Some(importance) = fields.importance {
        item.importance = importance;
    }
    if let Some(deadline) = &fields.deadline {
        item.deadline = Some(parse_deadline(deadline)?);
    }
    if no_deadline {
        item.deadline = None;
    }

    session.engine.update(item).wait().await;

    println!("Updated {}", short_id(&id));
    session.report_deferred(&id);
    Ok(())
}

#[cfg(test)]
#[path = "edit_tests.rs"]
mod tests;
