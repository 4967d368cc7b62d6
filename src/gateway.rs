// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login flow controller.
//!
//! Per browser the flow moves `Anonymous -> PendingCallback -> Authenticated`.
//! `PendingCallback` is not stored in the session: it lives in the redirect
//! round trip and the short-lived `state` cookie. The controller only talks
//! to the OIDC client and the session store; the HTTP handlers in
//! `api::auth` translate its outcomes into redirects and cookies.
//!
//! A callback commits the session with a single `SessionStore::create`
//! after every provider step succeeded, so a failure never leaves a
//! partially written session behind.

use axum::http::HeaderMap;
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::{OidcClient, OidcError, TokenSet};
use crate::store::{Session, SessionId, SessionStore};

pub const CALLBACK_PATH: &str = "/auth/callback";

/// Outcome of `login()`.
#[derive(Debug)]
pub enum LoginStart {
    /// A live session exists; go straight to the protected resource.
    AlreadyAuthenticated,
    /// Send the browser to the provider and remember `state`.
    Redirect { url: Url, state: String },
}

/// Query parameters App ID appends to the callback URL.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CallbackParams {
    /// One-time authorization code
    pub code: Option<String>,
    /// Echo of the `state` sent with the authorization request
    pub state: Option<String>,
    /// Provider error code (e.g. `access_denied`)
    pub error: Option<String>,
    /// Human readable provider error
    pub error_description: Option<String>,
}

/// How a callback's `state` parameter is checked.
#[derive(Debug, Clone, Copy)]
pub enum StateCheck<'a> {
    /// The value remembered at login, if the browser still carries it.
    /// A missing value or a missing or different `state` parameter is a
    /// mismatch.
    Required(Option<&'a str>),
    /// No login round trip to compare against.
    Skip,
}

impl StateCheck<'_> {
    fn verify(self, returned: Option<&str>) -> Result<(), FlowError> {
        match self {
            StateCheck::Skip => Ok(()),
            StateCheck::Required(Some(expected)) if returned == Some(expected) => Ok(()),
            StateCheck::Required(expected) => {
                warn!(
                    remembered = expected.is_some(),
                    returned = returned.is_some(),
                    "OAuth state mismatch"
                );
                Err(FlowError::StateMismatch)
            }
        }
    }
}

/// Why a flow step did not reach `Authenticated`.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("provider returned an error: {0}")]
    ProviderDenied(String),

    #[error("callback is missing the authorization code")]
    MissingCode,

    #[error("callback state does not match the login request")]
    StateMismatch,

    #[error("session has no refresh token")]
    NoRefreshToken,

    #[error("session no longer exists")]
    SessionGone,

    #[error(transparent)]
    Oidc(#[from] OidcError),
}

impl FlowError {
    /// Reason surfaced to the browser.
    pub fn reason(&self) -> String {
        match self {
            FlowError::ProviderDenied(reason) => reason.clone(),
            FlowError::MissingCode => "missing_code".to_string(),
            FlowError::StateMismatch => "state_mismatch".to_string(),
            FlowError::NoRefreshToken => "no_refresh_token".to_string(),
            FlowError::SessionGone => "session_not_found".to_string(),
            FlowError::Oidc(e) => e.error_code().to_string(),
        }
    }
}

/// Flow controller over one OIDC client and the session store.
pub struct Gateway<'a> {
    oidc: &'a OidcClient,
    sessions: &'a SessionStore,
}

impl<'a> Gateway<'a> {
    pub fn new(oidc: &'a OidcClient, sessions: &'a SessionStore) -> Self {
        Self { oidc, sessions }
    }

    /// Start a login. Idempotent for browsers that already have a session.
    pub fn login(&self, current: Option<&Session>, redirect_uri: &str) -> LoginStart {
        if current.is_some() {
            return LoginStart::AlreadyAuthenticated;
        }

        let state = Uuid::new_v4().simple().to_string();
        let url = self.oidc.build_login_url(redirect_uri, Some(&state));
        LoginStart::Redirect { url, state }
    }

    /// Complete the login from the provider's callback.
    ///
    /// The `state` parameter is checked after the provider error and the
    /// code, before any provider call. Any prior session of the browser
    /// (`previous`) is cleared first: the browser is `Anonymous` until this
    /// succeeds.
    pub async fn callback(
        &self,
        params: &CallbackParams,
        state_check: StateCheck<'_>,
        previous: Option<&SessionId>,
        redirect_uri: &str,
    ) -> Result<(SessionId, Session), FlowError> {
        if let Some(previous) = previous {
            self.sessions.clear(previous);
        }

        if let Some(error) = &params.error {
            let reason = params
                .error_description
                .clone()
                .unwrap_or_else(|| error.clone());
            warn!(error = %error, reason = %reason, "Provider returned an error to the callback");
            return Err(FlowError::ProviderDenied(reason));
        }

        let code = params
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or(FlowError::MissingCode)?;

        state_check.verify(params.state.as_deref())?;

        let tokens = self.oidc.exchange_code(code, redirect_uri).await?;
        self.verify_issued(&tokens).await?;
        let claims = self.oidc.fetch_user_info(&tokens.access_token).await?;

        let id = SessionId::generate();
        let session = self.sessions.create(&id, &tokens, claims);
        info!(
            sub = session.user_claims.sub().unwrap_or("<none>"),
            "Login completed"
        );
        Ok((id, session))
    }

    /// Verify every token that can be verified locally.
    ///
    /// The identity token is always a signed token. Access tokens are only
    /// verified when they are compact JWS; opaque ones are vouched for by
    /// the userinfo call that follows.
    async fn verify_issued(&self, tokens: &TokenSet) -> Result<(), OidcError> {
        if let Some(id_token) = &tokens.id_token {
            self.oidc.verify_token(id_token).await?;
        }
        if is_compact_jws(&tokens.access_token) {
            self.oidc.verify_token(&tokens.access_token).await?;
        }
        Ok(())
    }

    /// Replace the session's tokens using its refresh token.
    pub async fn refresh(&self, id: &SessionId, session: &Session) -> Result<(Session, TokenSet), FlowError> {
        let refresh_token = session
            .refresh_token
            .as_deref()
            .ok_or(FlowError::NoRefreshToken)?;

        let tokens = self.oidc.refresh_token(refresh_token).await?;
        self.verify_issued(&tokens).await?;

        let session = self
            .sessions
            .update_tokens(id, &tokens)
            .ok_or(FlowError::SessionGone)?;
        Ok((session, tokens))
    }
}

/// End the session. Safe to call without one, and needs no provider.
pub fn logout(sessions: &SessionStore, id: Option<&SessionId>) {
    if let Some(id) = id {
        sessions.clear(id);
        info!("Session cleared");
    }
}

fn is_compact_jws(token: &str) -> bool {
    let parts: Vec<&str> = token.split('.').collect();
    parts.len() == 3 && parts.iter().all(|p| !p.is_empty())
}

/// Callback URL for this request: the configured override, else derived
/// from the `Host` / `X-Forwarded-*` headers the browser came in on.
pub fn callback_url(configured: Option<&str>, headers: &HeaderMap, fallback_host: &str) -> String {
    if let Some(configured) = configured {
        return configured.to_string();
    }

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let host = header("x-forwarded-host")
        .or_else(|| header("host"))
        .filter(|h| !h.contains(['/', '\\', '@', ' ']))
        .unwrap_or(fallback_host);
    let scheme = match header("x-forwarded-proto") {
        Some("https") => "https",
        _ => "http",
    };

    format!("{scheme}://{host}{CALLBACK_PATH}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        jwks_body, oidc_client, sign_token, tenant_path, token_claims, TEST_KID,
    };
    use axum::http::HeaderValue;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const REDIRECT: &str = "http://localhost:5000/auth/callback";

    fn store() -> SessionStore {
        SessionStore::new(100, Duration::from_secs(300))
    }

    fn params(code: &str) -> CallbackParams {
        CallbackParams {
            code: Some(code.to_string()),
            ..Default::default()
        }
    }

    async fn mount_token(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path(tenant_path("token")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn mount_userinfo(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(tenant_path("userinfo")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn login_is_idempotent_when_authenticated() {
        let server = MockServer::start().await;
        let oidc = oidc_client(&server);
        let sessions = store();
        let id = SessionId::generate();
        let session = sessions.create(
            &id,
            &serde_json::from_value(json!({"access_token": "tok"})).unwrap(),
            Default::default(),
        );

        let gateway = Gateway::new(&oidc, &sessions);
        assert!(matches!(
            gateway.login(Some(&session), REDIRECT),
            LoginStart::AlreadyAuthenticated
        ));
        // No provider round trip was made
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn login_redirects_with_fresh_state() {
        let server = MockServer::start().await;
        let oidc = oidc_client(&server);
        let sessions = store();
        let gateway = Gateway::new(&oidc, &sessions);

        let LoginStart::Redirect { url, state } = gateway.login(None, REDIRECT) else {
            panic!("expected a redirect");
        };
        assert!(url.as_str().contains(&format!("state={state}")));
        let LoginStart::Redirect { state: other, .. } = gateway.login(None, REDIRECT) else {
            panic!("expected a redirect");
        };
        assert_ne!(state, other);
    }

    #[tokio::test]
    async fn callback_stores_exactly_the_userinfo_claims() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(tenant_path("token")))
            .and(body_string_contains("code=xyz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok1",
                "refresh_token": "ref1",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(tenant_path("userinfo")))
            .and(header("authorization", "Bearer tok1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"sub": "u1", "email": "a@b.com"})),
            )
            .mount(&server)
            .await;

        let oidc = oidc_client(&server);
        let sessions = store();
        let gateway = Gateway::new(&oidc, &sessions);

        let (id, session) = gateway
            .callback(&params("xyz"), StateCheck::Skip, None, REDIRECT)
            .await
            .unwrap();

        let stored = sessions.read(&id).unwrap();
        assert_eq!(stored, session);
        assert_eq!(stored.access_token, "tok1");
        assert_eq!(stored.refresh_token.as_deref(), Some("ref1"));
        assert_eq!(
            serde_json::to_value(&stored.user_claims).unwrap(),
            json!({"sub": "u1", "email": "a@b.com"})
        );
    }

    #[tokio::test]
    async fn exchange_failure_never_writes_a_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(tenant_path("token")))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let oidc = oidc_client(&server);
        let sessions = store();
        let gateway = Gateway::new(&oidc, &sessions);

        let err = gateway
            .callback(&params("abc"), StateCheck::Skip, None, REDIRECT)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FlowError::Oidc(OidcError::ExchangeFailed { status: 400, .. })
        ));
        assert_eq!(err.reason(), "token_exchange_failed");
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn userinfo_failure_never_writes_a_session() {
        let server = MockServer::start().await;
        mount_token(&server, json!({"access_token": "tok1"})).await;
        Mock::given(method("GET"))
            .and(path(tenant_path("userinfo")))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let oidc = oidc_client(&server);
        let sessions = store();
        let err = Gateway::new(&oidc, &sessions)
            .callback(&params("abc"), StateCheck::Skip, None, REDIRECT)
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "userinfo_failed");
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn signed_tokens_are_verified_before_the_session_is_written() {
        let server = MockServer::start().await;
        let oidc = oidc_client(&server);
        let issuer = oidc.config().issuer().to_string();

        Mock::given(method("GET"))
            .and(path(tenant_path("publickeys")))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body()))
            .mount(&server)
            .await;
        mount_token(
            &server,
            json!({
                "access_token": sign_token(&token_claims(&issuer, 3600), Some("unknown-kid")),
                "id_token": sign_token(&token_claims(&issuer, 3600), Some(TEST_KID)),
            }),
        )
        .await;
        mount_userinfo(&server, json!({"sub": "u1"})).await;

        let sessions = store();
        let err = Gateway::new(&oidc, &sessions)
            .callback(&params("abc"), StateCheck::Skip, None, REDIRECT)
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Oidc(OidcError::KeyNotFound)));
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn expired_id_token_aborts_the_flow() {
        let server = MockServer::start().await;
        let oidc = oidc_client(&server);
        let issuer = oidc.config().issuer().to_string();

        Mock::given(method("GET"))
            .and(path(tenant_path("publickeys")))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body()))
            .mount(&server)
            .await;
        mount_token(
            &server,
            json!({
                "access_token": "opaque",
                "id_token": sign_token(&token_claims(&issuer, -3600), Some(TEST_KID)),
            }),
        )
        .await;
        mount_userinfo(&server, json!({"sub": "u1"})).await;

        let sessions = store();
        let err = Gateway::new(&oidc, &sessions)
            .callback(&params("abc"), StateCheck::Skip, None, REDIRECT)
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "token_expired");
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn provider_error_and_missing_code_stay_anonymous() {
        let server = MockServer::start().await;
        let oidc = oidc_client(&server);
        let sessions = store();
        let gateway = Gateway::new(&oidc, &sessions);

        let denied = CallbackParams {
            error: Some("access_denied".to_string()),
            error_description: Some("User cancelled".to_string()),
            code: Some("ignored".to_string()),
            ..Default::default()
        };
        let err = gateway.callback(&denied, StateCheck::Skip, None, REDIRECT).await.unwrap_err();
        assert_eq!(err.reason(), "User cancelled");

        let err = gateway
            .callback(&CallbackParams::default(), StateCheck::Skip, None, REDIRECT)
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::MissingCode));

        assert!(server.received_requests().await.unwrap().is_empty());
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn required_state_must_be_remembered_and_match() {
        let server = MockServer::start().await;
        let oidc = oidc_client(&server);
        let sessions = store();
        let gateway = Gateway::new(&oidc, &sessions);

        let mut forged = params("abc");
        forged.state = Some("forged".to_string());
        let err = gateway
            .callback(&forged, StateCheck::Required(Some("expected")), None, REDIRECT)
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::StateMismatch));

        // No state cookie: a callback that never went through login
        let err = gateway
            .callback(&forged, StateCheck::Required(None), None, REDIRECT)
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "state_mismatch");

        // Remembered, but the provider echoed nothing back
        let err = gateway
            .callback(&params("abc"), StateCheck::Required(Some("expected")), None, REDIRECT)
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::StateMismatch));

        assert!(server.received_requests().await.unwrap().is_empty());
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn callback_clears_the_previous_session() {
        let server = MockServer::start().await;
        let oidc = oidc_client(&server);
        let sessions = store();
        let previous = SessionId::generate();
        sessions.create(
            &previous,
            &serde_json::from_value(json!({"access_token": "old"})).unwrap(),
            Default::default(),
        );

        let _ = Gateway::new(&oidc, &sessions)
            .callback(&CallbackParams::default(), StateCheck::Skip, Some(&previous), REDIRECT)
            .await;
        assert!(sessions.read(&previous).is_none());
    }

    #[tokio::test]
    async fn refresh_updates_tokens() {
        let server = MockServer::start().await;
        mount_token(&server, json!({"access_token": "tok2", "expires_in": 3600})).await;

        let oidc = oidc_client(&server);
        let sessions = store();
        let id = SessionId::generate();
        let session = sessions.create(
            &id,
            &serde_json::from_value(json!({"access_token": "tok1", "refresh_token": "ref1"}))
                .unwrap(),
            Default::default(),
        );

        let gateway = Gateway::new(&oidc, &sessions);
        let (updated, tokens) = gateway.refresh(&id, &session).await.unwrap();
        assert_eq!(tokens.expires_in, Some(3600));
        assert_eq!(updated.access_token, "tok2");
        assert_eq!(updated.refresh_token.as_deref(), Some("ref1"));

        let no_refresh = sessions.create(
            &id,
            &serde_json::from_value(json!({"access_token": "tok1"})).unwrap(),
            Default::default(),
        );
        assert!(matches!(
            gateway.refresh(&id, &no_refresh).await,
            Err(FlowError::NoRefreshToken)
        ));
    }

    #[test]
    fn callback_url_prefers_configuration() {
        let headers = HeaderMap::new();
        assert_eq!(
            callback_url(Some("https://app.example.com/cb"), &headers, "localhost:5000"),
            "https://app.example.com/cb"
        );
        assert_eq!(
            callback_url(None, &headers, "localhost:5000"),
            "http://localhost:5000/auth/callback"
        );
    }

    #[test]
    fn callback_url_uses_forwarded_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("internal:5000"));
        headers.insert("x-forwarded-host", HeaderValue::from_static("app.example.com"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(
            callback_url(None, &headers, "localhost:5000"),
            "https://app.example.com/auth/callback"
        );

        let mut suspicious = HeaderMap::new();
        suspicious.insert("host", HeaderValue::from_static("evil.com/@x"));
        assert_eq!(
            callback_url(None, &suspicious, "localhost:5000"),
            "http://localhost:5000/auth/callback"
        );
    }

    #[test]
    fn compact_jws_detection() {
        assert!(is_compact_jws("a.b.c"));
        assert!(!is_compact_jws("tok1"));
        assert!(!is_compact_jws("a..c"));
        assert!(!is_compact_jws("a.b.c.d"));
    }
}
