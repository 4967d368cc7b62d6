// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OIDC client errors.

use axum::http::StatusCode;

use crate::config::ConfigError;

/// Coarse classification used by the flow controller to pick an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Provider settings are missing or invalid.
    Config,
    /// A provider endpoint answered non-200, timed out or was unreachable.
    ProviderCommunication,
    /// A token failed verification. Never accepted.
    TokenValidation,
}

/// Errors raised by the OIDC client.
#[derive(Debug, thiserror::Error)]
pub enum OidcError {
    #[error("authentication provider is not configured: {0}")]
    Config(#[from] ConfigError),

    #[error("token exchange failed with HTTP {status}")]
    ExchangeFailed { status: u16, body: String },

    #[error("public key fetch failed with HTTP {status}")]
    KeyFetchFailed { status: u16 },

    #[error("user info request failed with HTTP {status}")]
    UserInfoFailed { status: u16 },

    #[error("token refresh failed with HTTP {status}")]
    RefreshFailed { status: u16 },

    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    #[error("{operation} request failed: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    #[error("{operation} returned an invalid response: {message}")]
    InvalidResponse {
        operation: &'static str,
        message: String,
    },

    #[error("token has expired")]
    Expired,

    #[error("no public key matches the token key id")]
    KeyNotFound,

    #[error("token signature or claims are invalid: {reason}")]
    InvalidSignatureOrClaims { reason: String },
}

impl OidcError {
    /// Map a reqwest failure, keeping timeouts distinct.
    pub(crate) fn transport(operation: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            OidcError::Timeout { operation }
        } else {
            OidcError::Transport {
                operation,
                message: err.to_string(),
            }
        }
    }

    pub(crate) fn invalid_token(reason: impl Into<String>) -> Self {
        OidcError::InvalidSignatureOrClaims {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OidcError::Config(_) => ErrorKind::Config,
            OidcError::ExchangeFailed { .. }
            | OidcError::KeyFetchFailed { .. }
            | OidcError::UserInfoFailed { .. }
            | OidcError::RefreshFailed { .. }
            | OidcError::Timeout { .. }
            | OidcError::Transport { .. }
            | OidcError::InvalidResponse { .. } => ErrorKind::ProviderCommunication,
            OidcError::Expired
            | OidcError::KeyNotFound
            | OidcError::InvalidSignatureOrClaims { .. } => ErrorKind::TokenValidation,
        }
    }

    /// Stable reason code surfaced to the browser.
    pub fn error_code(&self) -> &'static str {
        match self {
            OidcError::Config(_) => "provider_not_configured",
            OidcError::ExchangeFailed { .. } => "token_exchange_failed",
            OidcError::KeyFetchFailed { .. } => "key_fetch_failed",
            OidcError::UserInfoFailed { .. } => "userinfo_failed",
            OidcError::RefreshFailed { .. } => "token_refresh_failed",
            OidcError::Timeout { .. } => "provider_timeout",
            OidcError::Transport { .. } => "provider_unreachable",
            OidcError::InvalidResponse { .. } => "provider_invalid_response",
            OidcError::Expired => "token_expired",
            OidcError::KeyNotFound => "key_not_found",
            OidcError::InvalidSignatureOrClaims { .. } => "invalid_token",
        }
    }

    /// `true` when obtaining a fresh token may fix the failure.
    pub fn is_retryable_with_refresh(&self) -> bool {
        matches!(self, OidcError::Expired)
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Config => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::ProviderCommunication => StatusCode::BAD_GATEWAY,
            ErrorKind::TokenValidation => StatusCode::UNAUTHORIZED,
        }
    }
}
