//! Salla OAuth2 provider.

use crate::client::OAuth2Client;
use crate::config::SallaConfig;
use crate::error::{OAuth2Error, OAuth2Result};
use crate::state::{AuthorizationStateStore, PendingAuthorization, generate_state, states_match};
use crate::strategy::SallaStrategy;
use crate::types::{
    AuthorizationOptions, AuthorizationRedirect, AuthorizationRequest, CallbackParams, GrantType,
    SallaIdentity, TokenResult, UserProfile,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Salla authentication strategy.
///
/// Cheap to clone; configuration is read-only and the state store is shared.
#[derive(Clone)]
pub struct SallaProvider {
    config: Arc<SallaConfig>,
    client: OAuth2Client,
    state_store: Arc<dyn AuthorizationStateStore>,
}

impl SallaProvider {
    pub fn new(
        config: SallaConfig,
        state_store: Arc<dyn AuthorizationStateStore>,
    ) -> OAuth2Result<Self> {
        config.validate()?;

        let strategy = Arc::new(SallaStrategy::new(
            config.client_id.clone(),
            config.client_secret.clone(),
        ));
        let client = OAuth2Client::new(strategy, config.http_timeout_seconds)?;

        Ok(Self {
            config: Arc::new(config),
            client,
            state_store,
        })
    }

    pub fn provider_id(&self) -> &str {
        self.client.strategy().name()
    }

    pub fn config(&self) -> &SallaConfig {
        &self.config
    }

    /// Start an authorization for a session and return the redirect target
    pub async fn begin_authorization(
        &self,
        session_key: &str,
        options: &AuthorizationOptions,
    ) -> OAuth2Result<AuthorizationRedirect> {
        let state = generate_state(self.config.state_length);

        let request = AuthorizationRequest {
            client_id: self.config.client_id.clone(),
            redirect_uri: self.config.callback_url.clone(),
            scope: self.config.scope_param(),
            state: state.clone(),
            additional_params: BTreeMap::new(),
        };

        let url = self
            .client
            .authorization_url(&self.config.authorization_url, &request, options)?;

        self.state_store
            .store(PendingAuthorization::new(
                session_key.to_string(),
                state.clone(),
                self.config.callback_url.clone(),
                self.config.state_ttl_seconds,
            )?)
            .await?;

        info!("Started {} authorization flow", self.provider_id());

        Ok(AuthorizationRedirect { url, state })
    }

    /// Complete the authorization of a session from the callback parameters.
    ///
    /// The pending authorization is consumed whatever the outcome; the state
    /// is checked before any call to the token endpoint.
    pub async fn complete_authorization(
        &self,
        session_key: &str,
        callback: CallbackParams,
    ) -> OAuth2Result<SallaIdentity> {
        let pending = self.state_store.take(session_key).await?;

        if let Some(error) = callback.error {
            let description = callback
                .error_description
                .unwrap_or_else(|| "No description".to_string());
            warn!("Authorization denied by provider: {}: {}", error, description);
            return Err(OAuth2Error::AuthorizationDenied { error, description });
        }

        let received = callback.state.as_deref().unwrap_or_default();
        if !states_match(&pending.state, received) {
            warn!("Rejected callback with mismatching state");
            return Err(OAuth2Error::StateMismatch);
        }

        let code = callback
            .code
            .filter(|code| !code.is_empty())
            .ok_or(OAuth2Error::MissingAuthorizationCode)?;

        let mut params = BTreeMap::new();
        params.insert("redirect_uri".to_string(), pending.redirect_uri);

        let tokens = self
            .exchange_code_for_token(&code, params, GrantType::AuthorizationCode)
            .await?;
        let profile = self.fetch_profile(&tokens.access_token).await?;

        info!(
            "Authenticated {} user {}",
            self.provider_id(),
            profile.id().unwrap_or_else(|| "<unknown>".to_string())
        );

        Ok(SallaIdentity { tokens, profile })
    }

    /// Exchange an authorization code or refresh token for tokens.
    pub async fn exchange_code_for_token(
        &self,
        code: &str,
        params: BTreeMap<String, String>,
        grant: GrantType,
    ) -> OAuth2Result<TokenResult> {
        self.client
            .request_token(&self.config.token_url, grant, code, params)
            .await
    }

    /// Obtain a new access token with a refresh token.
    ///
    /// Salla may not rotate the refresh token; the result then carries none
    /// and callers keep the one they already hold.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> OAuth2Result<TokenResult> {
        self.exchange_code_for_token(refresh_token, BTreeMap::new(), GrantType::RefreshToken)
            .await
    }

    /// Retrieve the profile of the user an access token belongs to.
    pub async fn fetch_profile(&self, access_token: &str) -> OAuth2Result<UserProfile> {
        self.client
            .fetch_profile(&self.config.user_profile_url, access_token)
            .await
    }
}
