//! Web server module.

mod handlers;

use crate::config::ServerConfig;
use crate::store::Monitor;

use axum::{routing::get, Router};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub monitors: Arc<Vec<Arc<Monitor>>>,
    /// Recent samples included in each summary.
    pub recent: usize,
}

impl AppState {
    pub fn new(monitors: Vec<Arc<Monitor>>, recent: usize) -> Self {
        Self {
            monitors: Arc::new(monitors),
            recent,
        }
    }

    fn monitor(&self, address: &str) -> Option<&Arc<Monitor>> {
        self.monitors.iter().find(|m| m.target.address == address)
    }
}

/// Build the router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

    Router::new()
        .route("/api/status", get(handlers::handle_status))
        .route("/api/targets", get(handlers::handle_get_targets))
        .route("/api/target/{address}", get(handlers::handle_target_summary))
        .route("/api/target/{address}/recent", get(handlers::handle_target_recent))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Web server for the query API.
pub struct Server {
    addr: String,
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(config: &ServerConfig, monitors: Vec<Arc<Monitor>>) -> Self {
        Self {
            addr: config.http_addr.clone(),
            state: AppState::new(monitors, config.recent),
        }
    }

    /// Serve until `cancel` fires. Failing to bind is returned to the caller.
    pub async fn start(
        &self,
        cancel: CancellationToken,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = tokio::net::TcpListener::bind(self.addr.as_str()).await?;
        tracing::info!("HTTP server started ({})", listener.local_addr()?);

        axum::serve(listener, create_router(self.state.clone()))
            .with_graceful_shutdown(cancel.cancelled_owned())
            .await?;

        tracing::info!("HTTP server stopped ({})", self.addr);
        Ok(())
    }
}
