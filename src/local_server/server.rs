//! HTTP server
//!
//! Builds the axum router over the shared store and runs it in the
//! background until its `ServerHandle` is shut down.

use axum::{
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::config::ServerConfig;
use super::handlers::{self, AppState};
use crate::error::AppError;
use crate::storage::Database;

/// Server control handle
///
/// Dropping the handle also stops the server.
pub struct ServerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
    addr: SocketAddr,
}

impl ServerHandle {
    /// Port the server is listening on
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Bound socket address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal shutdown and wait for in-flight requests to finish
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                tracing::error!(error = %e, "server task failed");
            }
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// CORS policy: any origin when the list is empty, otherwise only the listed ones
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([header::CONTENT_DISPOSITION]);

    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

/// Build the API router over shared state
pub fn build_router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health_check))
        .route(
            "/api/sensor-data",
            get(handlers::list_readings)
                .post(handlers::create_reading)
                .delete(handlers::delete_readings),
        )
        .route("/api/sensor-data/latest", get(handlers::latest_reading))
        .route("/api/sensor-data/stats", get(handlers::stats))
        .route("/api/sensor-data/series", get(handlers::series))
        .route("/api/sensor-data/export", get(handlers::export_readings))
        .route("/api/analytics/health", get(handlers::analytics_health))
        .route("/api/analytics/fuel", get(handlers::analytics_fuel))
        .route("/api/analytics/comparison", get(handlers::analytics_comparison))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

/// EMSys HTTP server
pub struct LocalServer {
    config: ServerConfig,
    db: Arc<Mutex<Database>>,
}

impl LocalServer {
    /// Open the configured database under `config_dir`
    pub fn open(config_dir: &Path, config: ServerConfig) -> Result<Self, AppError> {
        let db_path = config.database_path(config_dir);
        let db = Database::new(&db_path)?;
        tracing::info!(path = %db_path.display(), "opened database");
        Ok(Self::with_database(config, Arc::new(Mutex::new(db))))
    }

    /// Create a server over an already opened database
    pub fn with_database(config: ServerConfig, db: Arc<Mutex<Database>>) -> Self {
        Self { config, db }
    }

    /// Router bound to this server's store and settings
    pub fn router(&self) -> Router {
        let state = Arc::new(AppState {
            db: self.db.clone(),
            pricing: self.config.pricing(),
        });
        build_router(state, &self.config.allowed_origins)
    }

    /// Start serving in the background
    ///
    /// # Arguments
    /// * `port` - Optional port; the configured port is used otherwise
    pub async fn start(&self, port: Option<u16>) -> Result<ServerHandle, AppError> {
        let port = port.unwrap_or(self.config.port);
        ServerConfig::validate_port(port)?;

        let listener = tokio::net::TcpListener::bind((self.config.host.as_str(), port))
            .await
            .map_err(|e| {
                AppError::internal(format!(
                    "Failed to bind to {}:{}: {}",
                    self.config.host, port, e
                ))
            })?;
        let addr = listener.local_addr()?;

        let app = self.router();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let join = tokio::spawn(async move {
            let graceful = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });

            if let Err(e) = graceful.await {
                tracing::error!(error = %e, "server error");
            }
        });

        tracing::info!(%addr, "EMSys API listening");

        Ok(ServerHandle {
            shutdown_tx: Some(shutdown_tx),
            join: Some(join),
            addr,
        })
    }

    /// Check whether a local port can be bound
    pub async fn check_port_available(port: u16) -> bool {
        tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], port)))
            .await
            .is_ok()
    }

    /// Fail with a validation error when `port` is already taken
    pub async fn ensure_port_available(port: u16) -> Result<(), AppError> {
        if Self::check_port_available(port).await {
            Ok(())
        } else {
            Err(AppError::Validation(format!("Port {} is already in use", port)))
        }
    }
}
