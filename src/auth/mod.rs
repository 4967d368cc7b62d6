// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! IBM App ID authentication for browser sessions.
//!
//! ## Auth Flow
//!
//! 1. `/login` redirects the browser to the App ID authorization endpoint
//! 2. App ID redirects back to `/auth/callback?code=...`
//! 3. The gateway:
//!    - Exchanges the code at the token endpoint
//!    - Verifies signed tokens against the tenant's public keys
//!      (signature, expiry, issuer, audience)
//!    - Fetches the user's claims from the userinfo endpoint
//!    - Stores `{access_token, refresh_token, user_claims}` server-side
//! 4. Protected routes use the `Authenticated` extractor, which redirects to
//!    `/login` when no live session exists
//!
//! ## Security
//!
//! - Session ids travel in an encrypted, HTTP-only cookie
//! - Verification fails closed when no public key matches the token
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod client;
pub mod cookies;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod provider;

pub use claims::{AccessTokenClaims, TokenSet, UserClaims};
pub use client::OidcClient;
pub use error::{ErrorKind, OidcError};
pub use extractor::{Authenticated, OptionalSession};
pub use jwks::KeyCache;
pub use provider::ProviderConfig;
