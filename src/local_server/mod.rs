//! HTTP server module
//!
//! Serves the EMSys JSON API and CSV export over axum. Binds
//! `127.0.0.1:3001` unless configured otherwise.

mod config;
mod handlers;
mod server;

pub use config::{default_config_dir, ServerConfig, DEFAULT_HOST, DEFAULT_PORT};
pub use handlers::{AppState, QueryParams};
pub use server::{build_router, LocalServer, ServerHandle};

#[cfg(test)]
mod tests;
