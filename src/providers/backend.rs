// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Backend API proxy.
//!
//! Forwards the session's access token as a bearer credential to the
//! backend service. Callers that render a page use [`BackendProxy::call_backend`],
//! which folds every failure into a `{"error": reason}` payload so the
//! response can still carry the user's identity.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{info, warn};
use url::Url;

use crate::config::{ConfigError, BACKEND_URL_ENV};

/// Path of the sample data resource on the backend.
pub const DATA_PATH: &str = "/api/data";

/// Longest backend error body echoed back to the browser.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend timed out")]
    Timeout,

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend returned {status}")]
    Status { status: u16, body: String },
}

impl BackendError {
    /// Reason placed in the `{"error": ...}` payload.
    pub fn reason(&self) -> String {
        match self {
            BackendError::Timeout => "backend_timeout".to_string(),
            BackendError::Unavailable(_) => "backend_unavailable".to_string(),
            BackendError::Status { status, .. } => format!("backend_status_{status}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendProxy {
    base_url: Url,
    http: Client,
}

impl BackendProxy {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ConfigError::invalid(BACKEND_URL_ENV, e.to_string()))?;

        let http = Client::builder().timeout(timeout).build().map_err(|e| {
            ConfigError::invalid(BACKEND_URL_ENV, format!("failed to build HTTP client: {e}"))
        })?;

        Ok(Self { base_url, http })
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// GET `path` with bearer auth. 200 bodies that are not JSON are
    /// wrapped as `{"data": text}`.
    pub async fn try_call(&self, path: &str, access_token: &str) -> Result<Value, BackendError> {
        let url = self.url_for(path);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout
                } else {
                    BackendError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout
            } else {
                BackendError::Unavailable(e.to_string())
            }
        })?;

        if status != StatusCode::OK {
            let mut body = text;
            body.truncate(floor_char_boundary(&body, MAX_ERROR_BODY));
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&text).unwrap_or_else(|_| json!({ "data": text })))
    }

    /// Like [`try_call`](Self::try_call) but never fails.
    pub async fn call_backend(&self, path: &str, access_token: &str) -> Value {
        match self.try_call(path, access_token).await {
            Ok(value) => {
                info!(path = %path, "Backend call succeeded");
                value
            }
            Err(e) => {
                warn!(path = %path, error = %e, "Backend call failed");
                json!({ "error": e.reason() })
            }
        }
    }
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
}
