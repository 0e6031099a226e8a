//! Cookie-backed server-side sessions.
//!
//! The browser only holds a random session id; the authenticated user and
//! their tokens stay in memory on the server. Sessions that sit idle past
//! their timeout are treated as unknown and removed by [`SessionStore::cleanup_expired`].

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use salla_identity_oauth2::{SallaIdentity, TokenResult, UserProfile};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "salla_session";

/// Idle timeout of sessions that never completed a login
pub const DEFAULT_ANONYMOUS_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Idle timeout of logged-in sessions
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// User attached to a session after a successful login
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub profile: UserProfile,
    pub tokens: TokenResult,
    pub authenticated_at: DateTime<Utc>,
}

impl From<SallaIdentity> for SessionUser {
    fn from(identity: SallaIdentity) -> Self {
        Self {
            profile: identity.profile,
            tokens: identity.tokens,
            authenticated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
struct SessionData {
    user: Option<SessionUser>,
    last_seen: Instant,
}

impl SessionData {
    fn new(user: Option<SessionUser>) -> Self {
        Self {
            user,
            last_seen: Instant::now(),
        }
    }
}

/// In-memory session store
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, SessionData>>,
    anonymous_timeout: Duration,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_timeouts(DEFAULT_ANONYMOUS_TIMEOUT, DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeouts(anonymous_timeout: Duration, idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            anonymous_timeout,
            idle_timeout,
        }
    }

    fn is_expired(&self, session: &SessionData) -> bool {
        let timeout = if session.user.is_some() {
            self.idle_timeout
        } else {
            self.anonymous_timeout
        };
        session.last_seen.elapsed() >= timeout
    }

    /// Session id carried by the request, if the store knows it and it is live
    pub fn session_id(&self, jar: &CookieJar) -> Option<String> {
        let id = jar.get(SESSION_COOKIE)?.value().to_string();
        let mut session = self.sessions.get_mut(&id)?;
        if self.is_expired(&session) {
            drop(session);
            self.sessions.remove(&id);
            return None;
        }
        session.last_seen = Instant::now();
        Some(id)
    }

    /// Reuse the request's session or start a new one
    pub fn get_or_create(&self, jar: CookieJar) -> (CookieJar, String) {
        if let Some(id) = self.session_id(&jar) {
            return (jar, id);
        }

        let id = Uuid::new_v4().to_string();
        self.sessions.insert(id.clone(), SessionData::new(None));
        (jar.add(session_cookie(id.clone())), id)
    }

    pub fn user(&self, session_id: &str) -> Option<SessionUser> {
        self.sessions
            .get(session_id)
            .and_then(|session| session.user.clone())
    }

    /// Log a user in under a freshly issued session id.
    ///
    /// The pre-login session is dropped so its id never becomes authenticated.
    pub fn login(
        &self,
        jar: CookieJar,
        previous_id: &str,
        user: SessionUser,
    ) -> (CookieJar, String) {
        self.sessions.remove(previous_id);

        let id = Uuid::new_v4().to_string();
        self.sessions.insert(id.clone(), SessionData::new(Some(user)));
        (jar.add(session_cookie(id.clone())), id)
    }

    /// Replace the tokens of a logged-in session
    pub fn update_tokens(&self, session_id: &str, tokens: TokenResult) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(mut session) => match session.user.as_mut() {
                Some(user) => {
                    user.tokens = tokens;
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    /// Drop the session and expire its cookie
    pub fn logout(&self, jar: CookieJar) -> CookieJar {
        if let Some(cookie) = jar.get(SESSION_COOKIE) {
            self.sessions.remove(cookie.value());
        }
        jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
    }

    /// Remove idle sessions, returning how many were dropped
    pub fn cleanup_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !self.is_expired(session));
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn session_cookie(id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}
