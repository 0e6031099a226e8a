//! Demo web application for the Salla OAuth2 strategy.
//!
//! Signs merchants in with Salla, keeps them in a cookie-backed server-side
//! session and shows their profile, orders and customers.

pub mod config;
pub mod merchant;
pub mod routes;
pub mod session;
pub mod views;

pub use config::AppConfig;
pub use routes::{AppState, app};
