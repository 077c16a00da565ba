//! HTTP API server for the murmur gateway

pub mod chat;
pub mod health;
pub mod rate_limit;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::config::ServerConfig;
use crate::pipeline::TranscribeAndRespond;

/// Shared state for API handlers
///
/// Immutable after startup; requests share nothing mutable.
pub struct ApiState {
    pub pipeline: TranscribeAndRespond,
    pub scratch_dir: PathBuf,
    pub rate_limiter: Option<rate_limit::SharedLimiter>,
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    pipeline: TranscribeAndRespond,
    port: u16,
    scratch_dir: PathBuf,
    max_upload_bytes: usize,
    rate_limit_rpm: Option<u32>,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(pipeline: TranscribeAndRespond, port: u16) -> Self {
        let defaults = ServerConfig::default();
        Self {
            pipeline,
            port,
            scratch_dir: defaults.scratch_dir,
            max_upload_bytes: defaults.max_upload_bytes,
            rate_limit_rpm: None,
        }
    }

    /// Apply scratch dir, upload limit and rate limit from server config
    #[must_use]
    pub fn server_config(mut self, config: &ServerConfig) -> Self {
        self.scratch_dir.clone_from(&config.scratch_dir);
        self.max_upload_bytes = config.max_upload_bytes;
        self.rate_limit_rpm = config.rate_limit_rpm;
        self
    }

    /// Set the directory for per-request scratch files
    #[must_use]
    pub fn scratch_dir(mut self, dir: PathBuf) -> Self {
        self.scratch_dir = dir;
        self
    }

    /// Set the maximum request body size
    #[must_use]
    pub const fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    /// Enable global rate limiting
    #[must_use]
    pub const fn rate_limit_rpm(mut self, rpm: Option<u32>) -> Self {
        self.rate_limit_rpm = rpm;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let rate_limiter = self.rate_limit_rpm.map(rate_limit::create_limiter);

        let state = Arc::new(ApiState {
            pipeline: self.pipeline,
            scratch_dir: self.scratch_dir,
            rate_limiter,
        });

        ApiServer {
            state,
            port: self.port,
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    max_upload_bytes: usize,
}

impl ApiServer {
    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let router = Router::new()
            .merge(chat::router(self.state.clone()))
            .merge(health::router())
            .merge(health::info_router(self.state.clone()))
            .layer(DefaultBodyLimit::max(self.max_upload_bytes));

        let router = router.layer(axum::middleware::from_fn_with_state(
            self.state.clone(),
            rate_limit::rate_limit_middleware,
        ));

        // CORS layer for cross-origin requests from browser clients
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        if self.state.rate_limiter.is_some() {
            tracing::info!("rate limiting active");
        }

        std::fs::create_dir_all(&self.state.scratch_dir)?;

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(
            port = self.port,
            model = self.state.pipeline.model_id(),
            scratch_dir = %self.state.scratch_dir.display(),
            "API server listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down API server");
}
