//! State generation and pending authorization storage for CSRF protection.
//!
//! Every authorization redirect mints a fresh `state` value and records it
//! against the browser session that requested it. The callback for that
//! session must echo the same value; a pending authorization is redeemable
//! exactly once and only until it expires.

use crate::error::{OAuth2Error, OAuth2Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;

/// Generate a random alphanumeric string of `length` characters.
///
/// Draws from the operating system CSPRNG; an unavailable entropy source
/// aborts with a panic inside `OsRng`.
pub fn generate_state(length: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Compare two state values in constant time.
pub fn states_match(expected: &str, received: &str) -> bool {
    expected.as_bytes().ct_eq(received.as_bytes()).into()
}

/// Authorization redirect issued for a session and not yet redeemed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAuthorization {
    pub session_key: String,
    pub state: String,
    pub redirect_uri: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingAuthorization {
    pub fn new(
        session_key: String,
        state: String,
        redirect_uri: String,
        ttl_seconds: u64,
    ) -> OAuth2Result<Self> {
        let created_at = Utc::now();
        let expires_at = i64::try_from(ttl_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|ttl| created_at.checked_add_signed(ttl))
            .ok_or_else(|| {
                OAuth2Error::Configuration(format!(
                    "state TTL of {} seconds is out of range",
                    ttl_seconds
                ))
            })?;

        Ok(Self {
            session_key,
            state,
            redirect_uri,
            created_at,
            expires_at,
        })
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Storage for pending authorizations, keyed by session
#[async_trait]
pub trait AuthorizationStateStore: Send + Sync {
    /// Store a pending authorization, replacing any earlier one for the session
    async fn store(&self, pending: PendingAuthorization) -> OAuth2Result<()>;

    /// Retrieve and remove the pending authorization of a session
    async fn take(&self, session_key: &str) -> OAuth2Result<PendingAuthorization>;

    /// Clean up expired entries
    async fn cleanup_expired(&self) -> OAuth2Result<usize>;
}

/// In-memory implementation of AuthorizationStateStore
#[derive(Clone, Default)]
pub struct InMemoryStateStore {
    pending: Arc<RwLock<HashMap<String, PendingAuthorization>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.pending.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pending.read().await.is_empty()
    }
}

#[async_trait]
impl AuthorizationStateStore for InMemoryStateStore {
    async fn store(&self, pending: PendingAuthorization) -> OAuth2Result<()> {
        let mut entries = self.pending.write().await;
        entries.insert(pending.session_key.clone(), pending);
        Ok(())
    }

    async fn take(&self, session_key: &str) -> OAuth2Result<PendingAuthorization> {
        let mut entries = self.pending.write().await;

        let pending = entries
            .remove(session_key)
            .ok_or(OAuth2Error::StateNotFound)?;

        if pending.is_expired() {
            return Err(OAuth2Error::StateNotFound);
        }

        Ok(pending)
    }

    async fn cleanup_expired(&self) -> OAuth2Result<usize> {
        let mut entries = self.pending.write().await;
        let before = entries.len();
        let now = Utc::now();
        entries.retain(|_, pending| now <= pending.expires_at);
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_state_length_and_alphabet() {
        let state = generate_state(16);
        assert_eq!(state.chars().count(), 16);
        assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));

        assert_eq!(generate_state(64).len(), 64);
        assert!(generate_state(0).is_empty());
    }

    #[test]
    fn test_generate_state_does_not_repeat() {
        let states: HashSet<String> = (0..10_000).map(|_| generate_state(16)).collect();
        assert_eq!(states.len(), 10_000);
    }

    #[test]
    fn test_states_match() {
        assert!(states_match("abcDEF123", "abcDEF123"));
        assert!(!states_match("abcDEF123", "abcDEF124"));
        assert!(!states_match("abc", "abcd"));
        assert!(!states_match("abc", ""));
    }

    #[test]
    fn test_out_of_range_ttl_is_rejected() {
        for ttl in [u64::MAX, 10_000_000_000_000] {
            let result = PendingAuthorization::new(
                "session-1".to_string(),
                generate_state(16),
                "http://localhost:8081/oauth/callback".to_string(),
                ttl,
            );
            assert!(matches!(result, Err(OAuth2Error::Configuration(_))));
        }
    }

    #[tokio::test]
    async fn test_pending_authorization_is_single_use() {
        let store = InMemoryStateStore::new();

        let pending = PendingAuthorization::new(
            "session-1".to_string(),
            generate_state(16),
            "http://localhost:8081/oauth/callback".to_string(),
            300,
        )
        .unwrap();
        let state = pending.state.clone();

        store.store(pending).await.unwrap();

        let retrieved = store.take("session-1").await.unwrap();
        assert_eq!(retrieved.state, state);

        let result = store.take("session-1").await;
        assert!(matches!(result, Err(OAuth2Error::StateNotFound)));
    }

    #[tokio::test]
    async fn test_new_redirect_replaces_previous_state() {
        let store = InMemoryStateStore::new();

        for state in ["first", "second"] {
            store
                .store(PendingAuthorization::new(
                    "session-1".to_string(),
                    state.to_string(),
                    "http://localhost:8081/oauth/callback".to_string(),
                    300,
                )
                .unwrap())
                .await
                .unwrap();
        }

        assert_eq!(store.len().await, 1);
        assert_eq!(store.take("session-1").await.unwrap().state, "second");
    }

    #[tokio::test]
    async fn test_expired_state_cleanup() {
        let store = InMemoryStateStore::new();

        let mut pending = PendingAuthorization::new(
            "session-1".to_string(),
            generate_state(16),
            "http://localhost:8081/oauth/callback".to_string(),
            300,
        )
        .unwrap();
        pending.expires_at = Utc::now() - TimeDelta::minutes(1);

        store.store(pending.clone()).await.unwrap();
        store
            .store(PendingAuthorization::new(
                "session-2".to_string(),
                generate_state(16),
                "http://localhost:8081/oauth/callback".to_string(),
                300,
            )
            .unwrap())
            .await
            .unwrap();

        let cleaned = store.cleanup_expired().await.unwrap();
        assert_eq!(cleaned, 1);
        assert_eq!(store.len().await, 1);

        let result = store.take("session-1").await;
        assert!(matches!(result, Err(OAuth2Error::StateNotFound)));
    }

    #[tokio::test]
    async fn test_expired_state_is_not_redeemable() {
        let store = InMemoryStateStore::new();

        let mut pending = PendingAuthorization::new(
            "session-1".to_string(),
            generate_state(16),
            "http://localhost:8081/oauth/callback".to_string(),
            300,
        )
        .unwrap();
        pending.expires_at = Utc::now() - TimeDelta::seconds(1);
        store.store(pending).await.unwrap();

        let result = store.take("session-1").await;
        assert!(matches!(result, Err(OAuth2Error::StateNotFound)));
        assert!(store.is_empty().await);
    }
}
