//! Health and service info endpoints

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use super::ApiState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Static descriptor of the service
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub message: String,
    pub endpoints: Endpoints,
    pub model: String,
}

/// Routes advertised by [`ServiceInfo`]
#[derive(Debug, Serialize)]
pub struct Endpoints {
    pub chat: &'static str,
    pub health: &'static str,
}

impl ServiceInfo {
    /// Describe a service backed by `model`
    #[must_use]
    pub fn new(model: &str) -> Self {
        Self {
            message: format!(
                "Voice Chat API is running ({model}). Use POST to send audio files."
            ),
            endpoints: Endpoints {
                chat: "/api/chat (POST)",
                health: "/api/health (GET)",
            },
            model: model.to_string(),
        }
    }
}

/// Liveness probe - is the service running?
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Service descriptor
pub(super) async fn info(State(state): State<Arc<ApiState>>) -> Json<ServiceInfo> {
    Json(ServiceInfo::new(state.pipeline.model_id()))
}

/// Build health router (liveness only, no state needed)
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

/// Build info router
pub fn info_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/health", get(info))
        .with_state(state)
}
