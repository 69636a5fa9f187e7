// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP implementation of [`RemoteClient`] using reqwest.
//!
//! Endpoints, relative to the configured base URL:
//!
//! ```text
//! GET    list        fetch_all
//! PATCH  list        bulk_sync
//! POST   list        add
//! PUT    list/{id}   update
//! DELETE list/{id}   delete
//! ```
//!
//! `{id}` is percent-encoded as a single path segment.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode, Url};
use tracing::debug;

use td_core::Item;

use super::protocol::{ElementRequest, ListRequest, Response, WireItem};
use super::{RemoteClient, RemoteError, RemoteFuture, RemoteResult, RemoteState};

/// Header carrying the client's last known revision.
pub const REVISION_HEADER: &str = "X-Last-Known-Revision";

/// Connection settings for [`HttpRemote`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL of the backend, e.g. `https://example.org/todobackend`.
    pub base_url: String,
    /// Bearer token.
    pub token: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Identifier written to `last_updated_by`.
    pub device_id: String,
}

/// Remote client talking to the backend over HTTP.
pub struct HttpRemote {
    client: Client,
    base: Url,
    config: HttpConfig,
}

impl HttpRemote {
    /// Creates a client with the configured per-request timeout.
    pub fn new(config: HttpConfig) -> RemoteResult<Self> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| RemoteError::InvalidRequest(format!("invalid base url: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(RemoteError::InvalidRequest(format!(
                "invalid base url: {}",
                config.base_url
            )));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemoteError::NetworkUnavailable(e.to_string()))?;
        Ok(HttpRemote {
            client,
            base,
            config,
        })
    }

    /// Appends percent-encoded path segments to the base URL.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn wire(&self, item: &Item) -> WireItem {
        WireItem::from_item(item, &self.config.device_id)
    }

    async fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        let response = request
            .bearer_auth(&self.config.token)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        debug!(status = status.as_u16(), "remote responded");

        if !status.is_success() {
            return Err(error_for_status(status, &body));
        }
        Response::from_json(&body)
    }
}

/// Maps a non-success HTTP status to a remote error.
pub fn error_for_status(status: StatusCode, body: &str) -> RemoteError {
    let detail = if body.trim().is_empty() {
        status.to_string()
    } else {
        format!("{status}: {}", body.trim())
    };
    match status {
        StatusCode::UNAUTHORIZED => RemoteError::AuthRejected,
        StatusCode::NOT_FOUND => RemoteError::NotFound,
        s if s.is_server_error() => RemoteError::ServerError(detail),
        _ => RemoteError::InvalidRequest(detail),
    }
}

/// Maps a reqwest failure (connect, timeout, body read) to a remote error.
fn transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_decode() {
        RemoteError::MalformedResponse(err.to_string())
    } else {
        RemoteError::NetworkUnavailable(err.to_string())
    }
}

impl RemoteClient for HttpRemote {
    fn add(&self, item: Item, known_revision: i64) -> RemoteFuture<'_, i64> {
        Box::pin(async move {
            let body = ElementRequest {
                element: self.wire(&item),
            };
            let request = self
                .client
                .post(self.url(&["list"]))
                .header(REVISION_HEADER, known_revision)
                .json(&body);
            self.send(request).await?.revision()
        })
    }

    fn update(&self, item: Item, known_revision: i64) -> RemoteFuture<'_, i64> {
        Box::pin(async move {
            let body = ElementRequest {
                element: self.wire(&item),
            };
            let request = self
                .client
                .put(self.url(&["list", &item.id]))
                .header(REVISION_HEADER, known_revision)
                .json(&body);
            self.send(request).await?.revision()
        })
    }

    fn delete(&self, id: String, known_revision: i64) -> RemoteFuture<'_, i64> {
        Box::pin(async move {
            let request = self
                .client
                .delete(self.url(&["list", &id]))
                .header(REVISION_HEADER, known_revision);
            self.send(request).await?.revision()
        })
    }

    fn fetch_all(&self) -> RemoteFuture<'_, RemoteState> {
        Box::pin(async move {
            let request = self.client.get(self.url(&["list"]));
            self.send(request).await?.into_state()
        })
    }

    fn bulk_sync(&self, items: Vec<Item>, known_revision: i64) -> RemoteFuture<'_, RemoteState> {
        Box::pin(async move {
            let body = ListRequest {
                list: items.iter().map(|item| self.wire(item)).collect(),
            };
            let request = self
                .client
                .patch(self.url(&["list"]))
                .header(REVISION_HEADER, known_revision)
                .json(&body);
            self.send(request).await?.into_state()
        })
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
