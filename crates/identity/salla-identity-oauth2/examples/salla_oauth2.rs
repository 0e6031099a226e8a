//! Example showing how to set up Salla OAuth2 authentication
//!
//! This example demonstrates:
//! 1. Setting up the strategy configuration
//! 2. Starting an authorization flow for a browser session
//! 3. Completing the flow from the callback parameters
//!
//! The callback is simulated with the state issued in step 2; pass an
//! authorization code as the first argument to attempt the exchange.

use salla_identity_oauth2::{
    AuthorizationOptions, CallbackParams, InMemoryStateStore, SallaConfig, SallaProvider,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = SallaConfig::new(
        std::env::var("CLIENT_ID").unwrap_or_else(|_| "your-salla-client-id".to_string()),
        std::env::var("CLIENT_SECRET").unwrap_or_else(|_| "your-salla-client-secret".to_string()),
        "http://localhost:8081/oauth/callback",
    )
    .with_scopes(["offline_access"])
    .with_state_ttl(600)
    .with_http_timeout(30);

    let state_store = Arc::new(InMemoryStateStore::new());
    let provider = SallaProvider::new(config, state_store)?;

    println!("Salla OAuth2 Example");
    println!("====================");

    let session_key = "example-session";
    let redirect = provider
        .begin_authorization(session_key, &AuthorizationOptions { show_dialog: true })
        .await?;

    println!("\n1. Open this URL in a browser:\n{}", redirect.url);
    println!("State: {}", redirect.state);

    let code = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "simulated_authorization_code".to_string());

    println!("\n2. Simulating the callback...");
    let callback = CallbackParams {
        code: Some(code),
        state: Some(redirect.state),
        ..Default::default()
    };

    match provider.complete_authorization(session_key, callback).await {
        Ok(identity) => {
            println!("Authenticated as {:?}", identity.profile.name());
            println!("Access token expires in {:?}s", identity.tokens.expires_in);
        }
        Err(e) => {
            println!("Authorization failed: {}", e);
            println!("Note: a simulated code is expected to be rejected by the provider");
        }
    }

    Ok(())
}
