use crate::AppCore;
use axum::{Extension, Json, Router, routing::get};
use serde_json::{Value, json};
use std::sync::Arc;

use super::{HttpConfig, api, middleware, ws};

pub fn build_router(core: Arc<AppCore>, config: &HttpConfig) -> Router {
    let cors = middleware::cors::build_cors_layer(&config.cors_origins);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api/v1", api::router().merge(ws::router()))
        .layer(cors)
        .layer(Extension(core))
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "WebPilot browser automation API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "api": "/api/v1",
    }))
}

/// Reports each collaborator; the browser is launched lazily, so `idle`
/// before the first execution is healthy.
async fn health_check(Extension(core): Extension<Arc<AppCore>>) -> Json<Value> {
    let database = match core.storage.tasks.count_tasks() {
        Ok(_) => "connected",
        Err(error) => {
            tracing::warn!(error = %error, "Health check could not read storage");
            "unavailable"
        }
    };
    let browser = if core.browser.is_initialized() {
        "ready"
    } else {
        "idle"
    };
    let ai = if core.inference_enabled() {
        "configured"
    } else {
        "fallback"
    };
    let status = if database == "connected" {
        "healthy"
    } else {
        "degraded"
    };

    Json(json!({
        "status": status,
        "services": {
            "database": database,
            "browser": browser,
            "ai": ai,
        }
    }))
}
