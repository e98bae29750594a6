//! Session and pending-authentication state.
//!
//! Both stores are in-process TTL maps keyed by the SHA-256 hash of a random
//! token; the raw token only ever exists in the client's cookie. Promotion of
//! a pending record is an atomic `take`: whichever caller removes the entry
//! first wins, so the same record can never become two sessions.

use anyhow::{Context, Result};
use base64::Engine;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

/// Subject attributes as established by the directory at bind time.
/// Immutable once produced; `groups` is the authoritative membership set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub groups: Vec<String>,
}

/// "Credentials verified, second factor outstanding."
///
/// Single-use: promoted into an [`AuthenticatedSession`] at most once, or
/// discarded on logout/expiry/new login attempt.
#[derive(Clone, Debug)]
pub struct PendingAuthentication {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub department: String,
    pub groups: Vec<String>,
    pub created_at: Instant,
}

impl PendingAuthentication {
    fn expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() >= ttl
    }
}

/// A fully authenticated session with an absolute expiry.
#[derive(Clone, Debug)]
pub struct AuthenticatedSession {
    pub identity: Identity,
    pub department: String,
    /// Absolute lifetime, not extended by activity.
    pub permanent: bool,
    pub issued_at: Instant,
    pub issued_at_unix: u64,
}

impl AuthenticatedSession {
    #[must_use]
    pub fn new(identity: Identity, department: String) -> Self {
        let issued_at_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            identity,
            department,
            permanent: true,
            issued_at: Instant::now(),
            issued_at_unix,
        }
    }

    fn expired(&self, ttl: Duration) -> bool {
        self.issued_at.elapsed() >= ttl
    }
}

/// Generate a random token for a cookie.
/// The raw value is only returned to set the cookie; stores keep a hash.
///
/// # Errors
/// Returns an error if the OS random source fails.
pub fn generate_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a token so raw values never live server-side.
#[must_use]
pub fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// In-process store for pending records and sessions.
pub struct SessionStore {
    pending_ttl: Duration,
    session_ttl: Duration,
    pending: Mutex<HashMap<Vec<u8>, PendingAuthentication>>,
    sessions: Mutex<HashMap<Vec<u8>, AuthenticatedSession>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(pending_ttl: Duration, session_ttl: Duration) -> Self {
        Self {
            pending_ttl,
            session_ttl,
            pending: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Store a pending record and return the cookie token.
    ///
    /// # Errors
    /// Returns an error if token generation fails.
    pub async fn insert_pending(&self, record: PendingAuthentication) -> Result<String> {
        let token = generate_token()?;
        let mut pending = self.pending.lock().await;
        pending.retain(|_, entry| !entry.expired(self.pending_ttl));
        pending.insert(hash_token(&token), record);
        Ok(token)
    }

    /// Read a pending record without consuming it. Expired records count as absent.
    pub async fn peek_pending(&self, token: &str) -> Option<PendingAuthentication> {
        let key = hash_token(token);
        let mut pending = self.pending.lock().await;
        match pending.get(&key) {
            Some(entry) if entry.expired(self.pending_ttl) => {
                pending.remove(&key);
                None
            }
            Some(entry) => Some(entry.clone()),
            None => None,
        }
    }

    /// Consume a pending record. At most one caller ever gets `Some` for a
    /// given token; racing promoters observe `None`.
    pub async fn take_pending(&self, token: &str) -> Option<PendingAuthentication> {
        let key = hash_token(token);
        let mut pending = self.pending.lock().await;
        let entry = pending.remove(&key)?;
        if entry.expired(self.pending_ttl) {
            None
        } else {
            Some(entry)
        }
    }

    pub async fn remove_pending(&self, token: &str) {
        let key = hash_token(token);
        self.pending.lock().await.remove(&key);
    }

    /// Store a session and return the cookie token.
    ///
    /// # Errors
    /// Returns an error if token generation fails.
    pub async fn insert_session(&self, session: AuthenticatedSession) -> Result<String> {
        let token = generate_token()?;
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, entry| !entry.expired(self.session_ttl));
        sessions.insert(hash_token(&token), session);
        Ok(token)
    }

    /// Resolve a session token. Expired sessions count as absent.
    pub async fn session(&self, token: &str) -> Option<AuthenticatedSession> {
        let key = hash_token(token);
        let mut sessions = self.sessions.lock().await;
        match sessions.get(&key) {
            Some(entry) if entry.expired(self.session_ttl) => {
                sessions.remove(&key);
                None
            }
            Some(entry) => Some(entry.clone()),
            None => None,
        }
    }

    /// Idempotent; removing an absent session is not an error.
    pub async fn remove_session(&self, token: &str) {
        let key = hash_token(token);
        self.sessions.lock().await.remove(&key);
    }

    pub async fn pending_count(&self) -> usize {
        let mut pending = self.pending.lock().await;
        pending.retain(|_, entry| !entry.expired(self.pending_ttl));
        pending.len()
    }

    pub async fn session_count(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, entry| !entry.expired(self.session_ttl));
        sessions.len()
    }
}
