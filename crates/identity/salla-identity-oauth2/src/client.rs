//! Generic OAuth2 client for the authorization code and refresh grants.

use crate::error::{OAuth2Error, OAuth2Result};
use crate::strategy::ProviderStrategy;
use crate::types::{AuthorizationOptions, AuthorizationRequest, GrantType, TokenResult, UserProfile};
use reqwest::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

/// OAuth2 client with provider behaviour supplied by a [`ProviderStrategy`]
#[derive(Clone)]
pub struct OAuth2Client {
    http_client: Client,
    strategy: Arc<dyn ProviderStrategy>,
}

impl OAuth2Client {
    pub fn new(strategy: Arc<dyn ProviderStrategy>, http_timeout_seconds: u64) -> OAuth2Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(http_timeout_seconds))
            .build()
            .map_err(OAuth2Error::Transport)?;

        Ok(Self::with_http_client(strategy, http_client))
    }

    pub fn with_http_client(strategy: Arc<dyn ProviderStrategy>, http_client: Client) -> Self {
        Self {
            http_client,
            strategy,
        }
    }

    pub fn strategy(&self) -> &Arc<dyn ProviderStrategy> {
        &self.strategy
    }

    /// Build the authorization URL the browser is redirected to
    pub fn authorization_url(
        &self,
        authorization_endpoint: &str,
        request: &AuthorizationRequest,
        options: &AuthorizationOptions,
    ) -> OAuth2Result<String> {
        let mut url = Url::parse(authorization_endpoint)?;

        {
            let mut params = url.query_pairs_mut();
            params.append_pair("response_type", "code");
            params.append_pair("client_id", &request.client_id);
            params.append_pair("redirect_uri", &request.redirect_uri);

            if let Some(scope) = &request.scope {
                params.append_pair("scope", scope);
            }

            params.append_pair("state", &request.state);

            for (key, value) in &request.additional_params {
                params.append_pair(key, value);
            }

            // Provider-specific parameters
            for (key, value) in self.strategy.authorization_params(options) {
                params.append_pair(&key, &value);
            }
        }

        debug!(
            "Generated authorization URL for provider {}",
            self.strategy.name()
        );

        Ok(url.into())
    }

    /// Exchange a code or refresh token at the token endpoint.
    ///
    /// Issues a single form-encoded POST and never retries: authorization
    /// codes are single-use, so a second attempt would fail at the provider.
    pub async fn request_token(
        &self,
        token_endpoint: &str,
        grant: GrantType,
        code: &str,
        params: BTreeMap<String, String>,
    ) -> OAuth2Result<TokenResult> {
        let mut form = params;
        self.strategy.prepare_token_form(grant, code, &mut form);

        let response = self
            .http_client
            .post(token_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                error!("Token request to {} failed: {}", token_endpoint, e);
                OAuth2Error::TokenExchange {
                    status: None,
                    reason: "token endpoint unreachable".to_string(),
                    source: Some(e),
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| OAuth2Error::TokenExchange {
            status: Some(status.as_u16()),
            reason: "failed to read token response".to_string(),
            source: Some(e),
        })?;

        if !status.is_success() {
            error!("Token exchange failed with {}: {}", status, body);
            return Err(OAuth2Error::TokenExchange {
                status: Some(status.as_u16()),
                reason: format!("{}: {}", status, body),
                source: None,
            });
        }

        let json = parse_json(token_endpoint, &body)?;
        let token = TokenResult::from_json(token_endpoint, json)?;

        info!("Successfully completed {} grant", grant);
        Ok(token)
    }

    /// Fetch the user profile with a bearer access token
    pub async fn fetch_profile(
        &self,
        userinfo_endpoint: &str,
        access_token: &str,
    ) -> OAuth2Result<UserProfile> {
        let response = self
            .http_client
            .get(userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                error!("User info request to {} failed: {}", userinfo_endpoint, e);
                OAuth2Error::ProfileFetch {
                    status: None,
                    reason: "user info endpoint unreachable".to_string(),
                    source: Some(e),
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| OAuth2Error::ProfileFetch {
            status: Some(status.as_u16()),
            reason: "failed to read user info response".to_string(),
            source: Some(e),
        })?;

        if !status.is_success() {
            error!("User info request failed with {}: {}", status, body);
            return Err(OAuth2Error::ProfileFetch {
                status: Some(status.as_u16()),
                reason: format!("{}: {}", status, body),
                source: None,
            });
        }

        let json = parse_json(userinfo_endpoint, &body)?;
        let profile = self.strategy.extract_profile(userinfo_endpoint, json)?;

        debug!(
            "Retrieved {} profile for user {:?}",
            self.strategy.name(),
            profile.id()
        );
        Ok(profile)
    }
}

fn parse_json(endpoint: &str, body: &str) -> OAuth2Result<Value> {
    serde_json::from_str(body).map_err(|e| {
        error!("Response from {} is not valid JSON: {}", endpoint, e);
        OAuth2Error::malformed(endpoint, e.to_string())
    })
}
