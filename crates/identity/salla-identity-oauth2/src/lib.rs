//! Salla OAuth2 authentication strategy.
//!
//! This crate implements the OAuth2 authorization code flow against the Salla
//! identity provider: building the authorization redirect, checking the
//! callback `state` against the value issued to the same session, exchanging
//! the code (or a refresh token) for tokens and fetching the user profile.
//!
//! The HTTP work lives in a generic [`OAuth2Client`]; everything specific to
//! Salla is injected through the [`ProviderStrategy`] implemented by
//! [`SallaStrategy`].

mod client;
mod config;
mod error;
mod params;
mod provider;
mod state;
mod strategy;
mod types;


pub use client::OAuth2Client;
pub use config::{
    DEFAULT_AUTHORIZATION_URL, DEFAULT_TOKEN_URL, DEFAULT_USER_PROFILE_URL, MAX_STATE_TTL_SECONDS,
    SallaConfig,
};
pub use error::{OAuth2Error, OAuth2Result};
pub use params::build_authorization_params;
pub use provider::SallaProvider;
pub use state::{
    AuthorizationStateStore, InMemoryStateStore, PendingAuthorization, generate_state,
    states_match,
};
pub use strategy::{ProviderStrategy, SallaStrategy};
pub use types::{
    AuthorizationOptions, AuthorizationRedirect, AuthorizationRequest, CallbackParams, GrantType,
    SallaIdentity, TokenResult, UserProfile,
};
