// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Server-side session store.
//!
//! Sessions are keyed by a random identifier carried in an encrypted
//! browser cookie and hold the tokens and identity claims established at
//! login. The store is a bounded LRU: the least recently used session is
//! evicted at capacity, and sessions idle for longer than the TTL read as
//! absent.

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::{TokenSet, UserClaims};

/// Browser session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Authenticated browser session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    #[serde(skip)]
    pub access_token: String,
    #[serde(skip)]
    pub refresh_token: Option<String>,
    pub user_claims: UserClaims,
    pub created_at: DateTime<Utc>,
}

struct Entry {
    session: Session,
    last_seen: Instant,
}

/// In-process LRU session store.
pub struct SessionStore {
    sessions: Mutex<LruCache<SessionId, Entry>>,
    idle_ttl: Duration,
}

impl SessionStore {
    /// - `capacity`: max number of live sessions.
    /// - `idle_ttl`: sessions unused for this long are dropped on access.
    pub fn new(capacity: usize, idle_ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            idle_ttl,
        }
    }

    /// Establish a session, replacing anything stored under `id`.
    pub fn create(&self, id: &SessionId, tokens: &TokenSet, claims: UserClaims) -> Session {
        let session = Session {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            user_claims: claims,
            created_at: Utc::now(),
        };

        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.put(
                id.clone(),
                Entry {
                    session: session.clone(),
                    last_seen: Instant::now(),
                },
            );
        }
        session
    }

    /// Current session for `id`, if any.
    pub fn read(&self, id: &SessionId) -> Option<Session> {
        let mut sessions = self.sessions.lock().ok()?;
        let expired = match sessions.get_mut(id) {
            Some(entry) if entry.last_seen.elapsed() < self.idle_ttl => {
                entry.last_seen = Instant::now();
                return Some(entry.session.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            sessions.pop(id);
        }
        None
    }

    /// Swap in refreshed tokens, keeping the identity claims.
    ///
    /// The refresh token is kept when the provider does not rotate it.
    pub fn update_tokens(&self, id: &SessionId, tokens: &TokenSet) -> Option<Session> {
        let mut sessions = self.sessions.lock().ok()?;
        let entry = sessions.get_mut(id)?;
        entry.session.access_token = tokens.access_token.clone();
        if let Some(refresh_token) = &tokens.refresh_token {
            entry.session.refresh_token = Some(refresh_token.clone());
        }
        entry.last_seen = Instant::now();
        Some(entry.session.clone())
    }

    /// Drop the session for `id`. No-op when absent.
    pub fn clear(&self, id: &SessionId) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.pop(id);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
