//! OAuth2 protocol types.

use crate::error::{OAuth2Error, OAuth2Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Grant used against the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    AuthorizationCode,
    RefreshToken,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::AuthorizationCode => "authorization_code",
            GrantType::RefreshToken => "refresh_token",
        }
    }

    /// Name of the form field that carries the code or refresh token.
    pub fn code_field(&self) -> &'static str {
        match self {
            GrantType::AuthorizationCode => "code",
            GrantType::RefreshToken => "refresh_token",
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful token exchange.
///
/// `extras` holds every field the token endpoint returned except
/// `refresh_token`, which is only exposed through its own field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResult {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    pub extras: Map<String, Value>,
}

impl TokenResult {
    /// Build a token result from a parsed token endpoint body.
    pub fn from_json(endpoint: &str, body: Value) -> OAuth2Result<Self> {
        let Value::Object(mut extras) = body else {
            return Err(OAuth2Error::malformed(
                endpoint,
                "token response is not a JSON object",
            ));
        };

        let access_token = match extras.get("access_token") {
            Some(Value::String(token)) if !token.is_empty() => token.clone(),
            _ => {
                return Err(OAuth2Error::malformed(
                    endpoint,
                    "token response has no access_token",
                ));
            }
        };

        let refresh_token = match extras.remove("refresh_token") {
            Some(Value::String(token)) if !token.is_empty() => Some(token),
            _ => None,
        };

        let expires_in = match extras.get("expires_in") {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        };

        Ok(Self {
            access_token,
            refresh_token,
            expires_in,
            extras,
        })
    }

    /// Keep a previously issued refresh token when the provider did not rotate it.
    pub fn or_refresh_token(mut self, previous: Option<String>) -> Self {
        if self.refresh_token.is_none() {
            self.refresh_token = previous;
        }
        self
    }
}

/// User profile returned by the user info endpoint.
///
/// The `data` object is kept verbatim; the accessors cover the fields Salla
/// documents and return `None` when a field is missing or has another type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(pub Map<String, Value>);

impl UserProfile {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// User id, accepting both numeric and string ids.
    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    pub fn email(&self) -> Option<&str> {
        self.str_field("email")
    }

    pub fn mobile(&self) -> Option<&str> {
        self.str_field("mobile")
    }

    pub fn role(&self) -> Option<&str> {
        self.str_field("role")
    }

    /// Store the user belongs to.
    pub fn merchant(&self) -> Option<&Map<String, Value>> {
        self.0.get("merchant")?.as_object()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    fn str_field(&self, field: &str) -> Option<&str> {
        self.0.get(field)?.as_str()
    }
}

/// Parameters of an authorization redirect before the provider hooks run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: Option<String>,
    pub state: String,
    pub additional_params: BTreeMap<String, String>,
}

/// Options recognised when building the authorization redirect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationOptions {
    /// Force the consent screen even if the user already approved the app
    #[serde(default)]
    pub show_dialog: bool,
}

/// Query parameters delivered to the callback URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Where to send the browser to start the flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationRedirect {
    pub url: String,
    pub state: String,
}

/// Tokens and profile handed to the host after a successful callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SallaIdentity {
    pub tokens: TokenResult,
    pub profile: UserProfile,
}
