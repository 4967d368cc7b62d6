// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outbound integrations other than the identity provider.

pub mod backend;

pub use backend::{BackendError, BackendProxy};
