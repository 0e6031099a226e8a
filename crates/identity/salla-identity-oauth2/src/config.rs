//! Salla OAuth2 strategy configuration.

use crate::error::{OAuth2Error, OAuth2Result};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_AUTHORIZATION_URL: &str = "https://accounts.salla.sa/oauth2/auth";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.salla.sa/oauth2/token";
pub const DEFAULT_USER_PROFILE_URL: &str = "https://accounts.salla.sa/oauth2/user/info";

/// Upper bound for `state_ttl_seconds` (one day)
pub const MAX_STATE_TTL_SECONDS: u64 = 24 * 60 * 60;

/// Strategy configuration.
///
/// Only the client credentials and the callback URL are required; every
/// endpoint falls back to the Salla production URLs. Missing credentials
/// deserialize as empty strings and are rejected by [`SallaConfig::validate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SallaConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub callback_url: String,
    #[serde(default = "default_authorization_url")]
    pub authorization_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_user_profile_url")]
    pub user_profile_url: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default = "default_scope_separator")]
    pub scope_separator: String,
    /// Length of the generated `state` value
    #[serde(default = "default_state_length")]
    pub state_length: usize,
    /// How long a pending authorization stays redeemable
    #[serde(default = "default_state_ttl")]
    pub state_ttl_seconds: u64,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
}

fn default_authorization_url() -> String {
    DEFAULT_AUTHORIZATION_URL.to_string()
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_user_profile_url() -> String {
    DEFAULT_USER_PROFILE_URL.to_string()
}

fn default_scope_separator() -> String {
    " ".to_string()
}

fn default_state_length() -> usize {
    16
}

fn default_state_ttl() -> u64 {
    600 // 10 minutes
}

fn default_http_timeout() -> u64 {
    30
}

impl SallaConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            callback_url: callback_url.into(),
            authorization_url: default_authorization_url(),
            token_url: default_token_url(),
            user_profile_url: default_user_profile_url(),
            scopes: Vec::new(),
            scope_separator: default_scope_separator(),
            state_length: default_state_length(),
            state_ttl_seconds: default_state_ttl(),
            http_timeout_seconds: default_http_timeout(),
        }
    }

    pub fn with_authorization_url(mut self, url: impl Into<String>) -> Self {
        self.authorization_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_user_profile_url(mut self, url: impl Into<String>) -> Self {
        self.user_profile_url = url.into();
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_scope_separator(mut self, separator: impl Into<String>) -> Self {
        self.scope_separator = separator.into();
        self
    }

    pub fn with_state_ttl(mut self, seconds: u64) -> Self {
        self.state_ttl_seconds = seconds;
        self
    }

    pub fn with_http_timeout(mut self, seconds: u64) -> Self {
        self.http_timeout_seconds = seconds;
        self
    }

    /// Scopes joined with the configured separator.
    pub fn scope_param(&self) -> Option<String> {
        if self.scopes.is_empty() {
            None
        } else {
            Some(self.scopes.join(&self.scope_separator))
        }
    }

    /// Validate credentials and endpoint URLs.
    pub fn validate(&self) -> OAuth2Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(OAuth2Error::Configuration(
                "client_id must not be empty".to_string(),
            ));
        }
        if self.client_secret.trim().is_empty() {
            return Err(OAuth2Error::Configuration(
                "client_secret must not be empty".to_string(),
            ));
        }
        if self.state_length == 0 {
            return Err(OAuth2Error::Configuration(
                "state_length must be greater than 0".to_string(),
            ));
        }
        if self.state_ttl_seconds == 0 || self.state_ttl_seconds > MAX_STATE_TTL_SECONDS {
            return Err(OAuth2Error::Configuration(format!(
                "state_ttl_seconds must be between 1 and {}",
                MAX_STATE_TTL_SECONDS
            )));
        }
        if self.http_timeout_seconds == 0 {
            return Err(OAuth2Error::Configuration(
                "http_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        for (name, value) in [
            ("callback_url", &self.callback_url),
            ("authorization_url", &self.authorization_url),
            ("token_url", &self.token_url),
            ("user_profile_url", &self.user_profile_url),
        ] {
            let url = Url::parse(value).map_err(|e| {
                OAuth2Error::Configuration(format!("{} '{}' is not an absolute URL: {}", name, value, e))
            })?;
            if url.cannot_be_a_base() || url.host_str().is_none() {
                return Err(OAuth2Error::Configuration(format!(
                    "{} '{}' must be an absolute http(s) URL",
                    name, value
                )));
            }
        }

        Ok(())
    }
}
