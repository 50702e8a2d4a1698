//! HTTP API server for courier

pub mod auth;
pub mod functions;
pub mod health;

use std::sync::Arc;

use axum::Router;
use secrecy::SecretString;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::plugins::PluginManager;
use crate::Result;

/// Shared state for API handlers
#[derive(Debug, Clone)]
pub struct ApiState {
    /// Operation routing table, built once at startup
    pub plugins: Arc<PluginManager>,
    /// Bearer token required on function routes
    pub api_key: Option<SecretString>,
}

impl ApiState {
    /// Wrap a plugin manager for sharing between handlers
    #[must_use]
    pub fn new(plugins: PluginManager) -> Self {
        Self {
            plugins: Arc::new(plugins),
            api_key: None,
        }
    }

    /// Require `api_key` as a Bearer token on function routes
    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<SecretString>) -> Self {
        self.api_key = api_key;
        self
    }
}

/// Build the router with all routes
pub fn router(state: ApiState) -> Router {
    Router::new()
        .nest("/api/functions", functions::router(state))
        .merge(health::router())
        .layer(TraceLayer::new_for_http())
}

/// API server
#[derive(Debug)]
pub struct ApiServer {
    state: ApiState,
    port: u16,
}

impl ApiServer {
    /// Create a server for `state` on `port`
    #[must_use]
    pub const fn new(state: ApiState, port: u16) -> Self {
        Self { state, port }
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        if self.state.api_key.is_none() {
            tracing::warn!("COURIER_API_KEY not set, function routes accept unauthenticated calls");
        }
        tracing::info!(
            port = self.port,
            operations = self.state.plugins.specs().len(),
            "API server listening"
        );

        axum::serve(listener, router(self.state))
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
