// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token sets and identity claims.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Tokens issued by the App ID token endpoint.
///
/// Wire shape: `{access_token, refresh_token?, id_token?, token_type, expires_in}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// OIDC identity token, returned when the `openid` scope was granted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

/// Identity claims returned by the userinfo endpoint (`sub`, `email`, `name`, ...).
///
/// Opaque beyond presence checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserClaims(Map<String, Value>);

impl UserClaims {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn sub(&self) -> Option<&str> {
        self.get_str("sub")
    }

    pub fn email(&self) -> Option<&str> {
        self.get_str("email")
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }
}

/// Verified payload of an App ID access or identity token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (App ID user id)
    pub sub: String,

    /// Issuer, the tenant OAuth server URL
    pub iss: String,

    /// Audience; App ID emits either a string or an array of client ids
    #[serde(default)]
    pub aud: Option<Value>,

    /// Expiration timestamp
    pub exp: i64,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: Option<i64>,

    /// Granted scopes, space separated
    #[serde(default)]
    pub scope: Option<String>,

    /// Remaining provider-specific claims
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AccessTokenClaims {
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope.as_deref().unwrap_or_default().split_whitespace()
    }
}
