//! Top-level router: MCP endpoint plus health check.

use std::sync::Arc;

use axum::{Json, Router, http::HeaderName, routing::get};
use serde::Serialize;
use slack_mcp_core::ClientFactory;
use slack_mcp_session::SessionRegistry;
use slack_mcp_transport::{SESSION_HEADER, create_mcp_router, handler::SERVER_NAME};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub timestamp: String,
    pub service: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        timestamp: chrono::Utc::now().to_rfc3339(),
        service: SERVER_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the application router.
pub fn create_router<F>(registry: Arc<SessionRegistry<F>>) -> Router
where
    F: ClientFactory,
{
    let cors = CorsLayer::permissive()
        .expose_headers([HeaderName::from_static(SESSION_HEADER)]);

    Router::new()
        .route("/health", get(health))
        .merge(create_mcp_router(registry))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
