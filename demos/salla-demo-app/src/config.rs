//! Configuration for the Salla demo application
//!
//! Sources, later ones winning:
//! - Default values
//! - Configuration file (config.toml, or the path in SALLA_APP_CONFIG_FILE)
//! - Environment variables with the SALLA_APP prefix
//! - The plain CLIENT_ID / CLIENT_SECRET / CALLBACK_URL / PORT variables
//!   that a `.env` file usually provides

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File};
use salla_identity_oauth2::SallaConfig;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use tracing::{debug, info};
use url::Url;

/// Main configuration struct for the demo application
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,

    /// OAuth2 strategy settings
    pub salla: SallaConfig,

    pub merchant_api: MerchantApiConfig,

    pub session: SessionConfig,

    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to (default: 127.0.0.1)
    pub host: IpAddr,

    /// Port to bind to (default: 8081)
    pub port: u16,
}

/// Salla merchant API used by the orders and customers pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MerchantApiConfig {
    pub base_url: String,
    pub http_timeout_seconds: u64,
}

/// Browser session timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle timeout of sessions that have not logged in yet
    pub anonymous_timeout_seconds: u64,

    /// Idle timeout of logged-in sessions
    pub idle_timeout_seconds: u64,

    /// How often idle sessions and expired login states are swept
    pub cleanup_interval_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter string
    pub level: String,

    /// Log format (pretty, compact)
    pub format: String,
}

fn default_host() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_port() -> u16 {
    8081
}

fn default_callback_url(port: u16) -> String {
    format!("http://localhost:{}/oauth/callback", port)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            salla: SallaConfig::new("", "", default_callback_url(default_port()))
                .with_scopes(["offline_access"]),
            merchant_api: MerchantApiConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for MerchantApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.salla.dev/admin/v2".to_string(),
            http_timeout_seconds: 30,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            anonymous_timeout_seconds: 600,
            idle_timeout_seconds: 24 * 60 * 60,
            cleanup_interval_seconds: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        let config_path = std::env::var("SALLA_APP_CONFIG_FILE")
            .unwrap_or_else(|_| "config.toml".to_string());

        if std::path::Path::new(&config_path).exists() {
            info!("Loading configuration from {}", config_path);
            builder = builder.add_source(File::with_name(&config_path));
        } else {
            debug!("No config file found at {}, using defaults", config_path);
        }

        builder = builder.add_source(
            Environment::with_prefix("SALLA_APP")
                .separator("__") // e.g. SALLA_APP__SERVER__PORT
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let mut settings: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        settings.apply_env_overrides()?;

        if settings.salla.callback_url.is_empty() {
            settings.salla.callback_url = default_callback_url(settings.server.port);
        }

        settings.validate()?;

        Ok(settings)
    }

    /// Apply the plain environment variables used by `.env` files
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(client_id) = std::env::var("CLIENT_ID") {
            info!("Using CLIENT_ID environment variable");
            self.salla.client_id = client_id;
        }

        if let Ok(client_secret) = std::env::var("CLIENT_SECRET") {
            info!("Using CLIENT_SECRET environment variable");
            self.salla.client_secret = client_secret;
        }

        if let Ok(callback_url) = std::env::var("CALLBACK_URL") {
            info!("Using CALLBACK_URL environment variable");
            self.salla.callback_url = callback_url;
        }

        if let Ok(host) = std::env::var("HOST") {
            info!("Using HOST environment variable");
            self.server.host = host.parse().context("Invalid HOST value")?;
        }

        if let Ok(port) = std::env::var("PORT") {
            info!("Using PORT environment variable");
            self.server.port = port.parse().context("Invalid PORT value")?;
        }

        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.logging.level = log_level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        self.salla
            .validate()
            .context("Invalid Salla OAuth2 configuration")?;

        Url::parse(&self.merchant_api.base_url).with_context(|| {
            format!(
                "Merchant API base URL '{}' is not a valid URL",
                self.merchant_api.base_url
            )
        })?;

        if self.session.anonymous_timeout_seconds == 0
            || self.session.idle_timeout_seconds == 0
            || self.session.cleanup_interval_seconds == 0
        {
            anyhow::bail!("Session timeouts and cleanup interval must be greater than 0");
        }

        let is_filter = self.logging.level.contains('=') || self.logging.level.contains(',');
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !is_filter && !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid log level '{}'. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            );
        }

        let valid_formats = ["pretty", "compact"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid log format '{}'. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            );
        }

        Ok(())
    }

    /// Get the socket address for the server
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.server.host, self.server.port))
    }

    /// Get the log filter string for tracing
    pub fn log_filter(&self) -> String {
        if self.logging.level.contains('=') || self.logging.level.contains(',') {
            self.logging.level.clone()
        } else {
            format!(
                "salla_demo_app={level},salla_identity_oauth2={level},tower_http={level},{level}",
                level = self.logging.level
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.salla.client_id = "client".to_string();
        config.salla.client_secret = "secret".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = valid_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8081");
        assert_eq!(
            config.salla.callback_url,
            "http://localhost:8081/oauth/callback"
        );
        assert_eq!(config.salla.scopes, vec!["offline_access".to_string()]);
    }

    #[test]
    fn test_missing_credentials() {
        assert!(AppConfig::default().validate().is_err());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = valid_config();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.merchant_api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.session.anonymous_timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.session.cleanup_interval_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.salla.state_ttl_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_filter() {
        let mut config = valid_config();
        assert_eq!(
            config.log_filter(),
            "salla_demo_app=info,salla_identity_oauth2=info,tower_http=info,info"
        );

        config.logging.level = "warn,salla_demo_app=debug".to_string();
        assert!(config.validate().is_ok());
        assert_eq!(config.log_filter(), "warn,salla_demo_app=debug");
    }

    #[test]
    fn test_deserialize_partial_file() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "server": {"port": 9000},
            "salla": {"client_id": "client", "client_secret": "secret",
                      "callback_url": "http://localhost:9000/oauth/callback"}
        }))
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, default_host());
        assert_eq!(config.logging.format, "pretty");
        assert!(config.validate().is_ok());
    }
}
