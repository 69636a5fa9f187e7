// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wire records for the revision-based todo backend.
//!
//! Single-item mutations send `{"element": ...}`, bulk sync sends
//! `{"list": [...]}`. Every response carries the collection `revision`.
//! The local dirty flag never crosses the wire.

use serde::{Deserialize, Serialize};

use td_core::{Importance, Item};

use super::{RemoteError, RemoteResult, RemoteState};

/// Importance as spelled by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireImportance {
    Low,
    Basic,
    Important,
}

impl From<Importance> for WireImportance {
    fn from(importance: Importance) -> Self {
        match importance {
            Importance::Low => WireImportance::Low,
            Importance::Normal => WireImportance::Basic,
            Importance::High => WireImportance::Important,
        }
    }
}

impl From<WireImportance> for Importance {
    fn from(importance: WireImportance) -> Self {
        match importance {
            WireImportance::Low => Importance::Low,
            WireImportance::Basic => Importance::Normal,
            WireImportance::Important => Importance::High,
        }
    }
}

/// An item as the backend encodes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireItem {
    pub id: String,
    pub text: String,
    pub importance: WireImportance,
    pub done: bool,
    pub created_at: i64,
    pub changed_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<i64>,
    pub last_updated_by: String,
}

impl WireItem {
    /// Encodes a local item, stamping it with the device that sent it.
    pub fn from_item(item: &Item, device_id: &str) -> Self {
        WireItem {
            id: item.id.clone(),
            text: item.text.clone(),
            importance: item.importance.into(),
            done: item.is_done,
            created_at: item.created_at,
            changed_at: item.last_changed(),
            deadline: item.deadline,
            last_updated_by: device_id.to_string(),
        }
    }

    /// Decodes into a clean local item. `changed_at` is always set, since the
    /// wire format cannot say that an item was never changed.
    pub fn into_item(self) -> Item {
        Item {
            id: self.id,
            text: self.text,
            importance: self.importance.into(),
            is_done: self.done,
            created_at: self.created_at,
            changed_at: Some(self.changed_at),
            deadline: self.deadline,
            is_dirty: false,
        }
    }
}

/// Request body for add/update.
#[derive(Debug, Clone, Serialize)]
pub struct ElementRequest {
    pub element: WireItem,
}

/// Request body for bulk sync.
#[derive(Debug, Clone, Serialize)]
pub struct ListRequest {
    pub list: Vec<WireItem>,
}

/// Response body shared by every endpoint.
///
/// Fields are optional so that a missing one is reported as
/// [`RemoteError::MalformedResponse`] rather than a generic decode error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub element: Option<WireItem>,
    #[serde(default)]
    pub list: Option<Vec<WireItem>>,
    #[serde(default)]
    pub revision: Option<i64>,
}

impl Response {
    /// Parses a response body.
    pub fn from_json(body: &str) -> RemoteResult<Self> {
        serde_json::from_str(body).map_err(|e| RemoteError::MalformedResponse(e.to_string()))
    }

    /// The revision, required by every endpoint.
    pub fn revision(&self) -> RemoteResult<i64> {
        self.revision
            .ok_or_else(|| RemoteError::MalformedResponse("missing revision".to_string()))
    }

    /// The full item list plus revision, for fetch and bulk sync.
    pub fn into_state(self) -> RemoteResult<RemoteState> {
        let revision = self.revision()?;
        let list = self
            .list
            .ok_or_else(|| RemoteError::MalformedResponse("missing list".to_string()))?;
        Ok(RemoteState {
            items: list.into_iter().map(WireItem::into_item).collect(),
            revision,
        })
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
