use anyhow::{Context, Result};
use salla_demo_app::{AppConfig, AppState, app, merchant::MerchantApi, session::SessionStore};
use salla_identity_oauth2::{AuthorizationStateStore, InMemoryStateStore, SallaProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(&config);

    info!("Starting Salla OAuth2 demo server");

    let state_store = Arc::new(InMemoryStateStore::new());
    let provider = SallaProvider::new(config.salla.clone(), state_store.clone())
        .context("Failed to create Salla OAuth2 provider")?;
    info!(
        "OAuth2 provider '{}' initialized, callback URL: {}",
        provider.provider_id(),
        config.salla.callback_url
    );

    let sessions = SessionStore::with_timeouts(
        Duration::from_secs(config.session.anonymous_timeout_seconds),
        Duration::from_secs(config.session.idle_timeout_seconds),
    );

    tokio::spawn(cleanup_expired(
        state_store,
        sessions.clone(),
        Duration::from_secs(config.session.cleanup_interval_seconds),
    ));

    let state = AppState {
        provider: Arc::new(provider),
        sessions,
        merchant: MerchantApi::new(&config.merchant_api)?,
    };

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Server running on http://{}", addr);
    warn!(
        "This is an example application. Do not use in production without proper security review."
    );

    axum::serve(listener, app(state))
        .await
        .context("Server error")?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_new(config.log_filter()).unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if config.logging.format.eq_ignore_ascii_case("compact") {
        builder.compact().init();
    } else {
        builder.pretty().init();
    }
}

/// Periodically sweep expired login states and idle sessions
async fn cleanup_expired(
    store: Arc<InMemoryStateStore>,
    sessions: SessionStore,
    period: Duration,
) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        match store.cleanup_expired().await {
            Ok(removed) if removed > 0 => debug!("Removed {} expired authorizations", removed),
            Ok(_) => {}
            Err(e) => warn!("Failed to clean up pending authorizations: {}", e),
        }

        let removed = sessions.cleanup_expired();
        if removed > 0 {
            debug!("Removed {} idle sessions", removed);
        }
    }
}
