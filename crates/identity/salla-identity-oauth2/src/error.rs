//! OAuth2 error types.

use thiserror::Error;

pub type OAuth2Result<T> = Result<T, OAuth2Error>;

#[derive(Debug, Error)]
pub enum OAuth2Error {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("HTTP request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The token endpoint could not be reached or rejected the grant.
    #[error("Token exchange failed: {reason}")]
    TokenExchange {
        status: Option<u16>,
        reason: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The profile endpoint could not be reached or refused the access token.
    #[error("Failed to fetch user profile: {reason}")]
    ProfileFetch {
        status: Option<u16>,
        reason: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Malformed response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },

    #[error("State parameter does not match the pending authorization")]
    StateMismatch,

    #[error("No pending authorization for this session")]
    StateNotFound,

    #[error("Authorization denied: {error}: {description}")]
    AuthorizationDenied { error: String, description: String },

    #[error("Missing authorization code")]
    MissingAuthorizationCode,

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),
}

impl OAuth2Error {
    pub(crate) fn malformed(endpoint: &str, reason: impl Into<String>) -> Self {
        OAuth2Error::MalformedResponse {
            endpoint: endpoint.to_string(),
            reason: reason.into(),
        }
    }

    /// True for failures where the provider could not be reached at all.
    pub fn is_transport(&self) -> bool {
        match self {
            OAuth2Error::Transport(_) => true,
            OAuth2Error::TokenExchange { source, .. } | OAuth2Error::ProfileFetch { source, .. } => {
                source.is_some()
            }
            _ => false,
        }
    }
}
