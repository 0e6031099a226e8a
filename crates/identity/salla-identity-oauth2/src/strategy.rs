//! Provider hooks injected into the generic OAuth2 client.

use crate::error::{OAuth2Error, OAuth2Result};
use crate::params::build_authorization_params;
use crate::types::{AuthorizationOptions, GrantType, UserProfile};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Provider-specific behaviour of an OAuth2 flow.
///
/// The generic client owns the HTTP calls; a strategy only shapes the token
/// request form, adds authorization parameters and pulls the profile out of
/// the user info body.
pub trait ProviderStrategy: Send + Sync {
    /// Name used in logs and identities
    fn name(&self) -> &str;

    /// Fill the token request form for `grant`, with `code` holding either the
    /// authorization code or the refresh token.
    fn prepare_token_form(&self, grant: GrantType, code: &str, form: &mut BTreeMap<String, String>);

    /// Extra query parameters for the authorization redirect.
    fn authorization_params(&self, _options: &AuthorizationOptions) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    /// Extract the user profile from a parsed user info body.
    fn extract_profile(&self, endpoint: &str, body: Value) -> OAuth2Result<UserProfile>;
}

/// Salla strategy: client credentials travel in the form body and the
/// profile lives under the `data` key of the user info response.
#[derive(Debug, Clone)]
pub struct SallaStrategy {
    client_id: String,
    client_secret: String,
}

impl SallaStrategy {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl ProviderStrategy for SallaStrategy {
    fn name(&self) -> &str {
        "salla"
    }

    fn prepare_token_form(&self, grant: GrantType, code: &str, form: &mut BTreeMap<String, String>) {
        form.insert("grant_type".to_string(), grant.as_str().to_string());
        form.insert(grant.code_field().to_string(), code.to_string());
        form.insert("client_id".to_string(), self.client_id.clone());
        form.insert("client_secret".to_string(), self.client_secret.clone());
    }

    fn authorization_params(&self, options: &AuthorizationOptions) -> BTreeMap<String, String> {
        build_authorization_params(options)
    }

    fn extract_profile(&self, endpoint: &str, body: Value) -> OAuth2Result<UserProfile> {
        let Value::Object(mut root) = body else {
            return Err(OAuth2Error::malformed(
                endpoint,
                "user info response is not a JSON object",
            ));
        };

        match root.remove("data") {
            Some(Value::Object(data)) => Ok(UserProfile(data)),
            None | Some(Value::Null) => {
                warn!("User info response from {} has no data field", endpoint);
                Ok(UserProfile::default())
            }
            Some(other) => Err(OAuth2Error::malformed(
                endpoint,
                format!("expected data to be an object, got {}", json_kind(&other)),
            )),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
