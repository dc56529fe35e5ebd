//! API server: wires routes, middleware and state together.

use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::routes;
use crate::state::{AppState, ServerConfig};

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Server configuration.
    pub server: ServerConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 4310)),
            server: ServerConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Set the bind address.
    #[must_use]
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the bind port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.bind_addr.set_port(port);
        self
    }

    /// Set the artifact root directory.
    #[must_use]
    pub fn with_artifact_root(mut self, root: impl Into<std::path::PathBuf>) -> Self {
        self.server.artifact_root = root.into();
        self
    }
}

/// API server instance.
pub struct ApiServer {
    config: ApiConfig,
    state: AppState,
    router: Router,
}

impl ApiServer {
    /// Create a server with the given configuration.
    pub fn new(config: ApiConfig) -> Self {
        let state = AppState::new(config.server.clone());
        Self::with_state(state, config)
    }

    /// Create a server with existing application state.
    pub fn with_state(state: AppState, config: ApiConfig) -> Self {
        let router = Self::build_router(&state);
        Self {
            config,
            state,
            router,
        }
    }

    /// Build the complete router with all routes and middleware.
    fn build_router(state: &AppState) -> Router {
        let router = routes::api_router(state.clone())
            .layer(TraceLayer::new_for_http());

        if state.config.cors_enabled {
            router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        } else {
            router
        }
    }

    /// The configured bind address.
    pub fn addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// The application state (for tests).
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The router (for tests).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until the process is stopped.
    pub async fn run(self) -> dashlens::Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!(addr = %self.config.bind_addr, "dashlens API listening");
        axum::serve(listener, self.router).await?;
        Ok(())
    }

    /// Run the server until the given shutdown signal resolves.
    pub async fn run_until<F>(self, shutdown_signal: F) -> dashlens::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!(addr = %self.config.bind_addr, "dashlens API listening");
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal)
            .await?;
        info!("Server shutdown complete");
        Ok(())
    }
}
