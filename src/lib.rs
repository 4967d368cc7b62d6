// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! App ID Gateway - Browser Sign-in Frontend
//!
//! This crate signs browsers in through IBM App ID using the OpenID Connect
//! authorization-code flow, keeps the resulting tokens in a server-side
//! session and forwards the access token to a separate backend API.
//!
//! ## Modules
//!
//! - `api` - HTTP routes (Axum)
//! - `auth` - App ID client, token verification, cookies and route guard
//! - `gateway` - Login flow controller
//! - `providers` - Backend API proxy
//! - `store` - Server-side session store

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod providers;
pub mod state;
pub mod store;

#[cfg(test)]
mod test_support;
