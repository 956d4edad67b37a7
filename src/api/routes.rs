//! API route configuration

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::{
    middleware::{rate_limit_middleware, RateLimiter},
    observability::HealthStatus,
};

use super::handlers::{self, AppState};

/// Build the complete API router with middleware
pub fn build_router(app_state: AppState, rate_limiter: Arc<RateLimiter>, max_body_bytes: usize) -> Router {
    let public_routes = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(app_state.clone());

    // Rate limiting and body size limit apply to the analysis endpoints only
    let api_routes = Router::new()
        .route("/prompt", post(handlers::prompt))
        .route("/rca-from-tempest", post(handlers::rca_from_tempest))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn_with_state(
                    rate_limiter,
                    rate_limit_middleware,
                )),
        )
        .with_state(app_state);

    public_routes.merge(api_routes)
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "service": "RCA Accelerator",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

fn status_code(status: &HealthStatus) -> StatusCode {
    match status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn health_handler(State(app_state): State<AppState>) -> impl IntoResponse {
    let health = app_state.health_checker.check_health().await;
    (status_code(&health.status), Json(health))
}

async fn liveness_handler(State(app_state): State<AppState>) -> impl IntoResponse {
    if app_state.health_checker.liveness() {
        (StatusCode::OK, Json(json!({"status": "alive"})))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"status": "dead"})))
    }
}

async fn readiness_handler(State(app_state): State<AppState>) -> impl IntoResponse {
    let ready = app_state.health_checker.readiness().await;
    // Served from the cache filled by the readiness check
    let health = app_state.health_checker.check_health().await;

    if ready {
        (StatusCode::OK, Json(json!({"status": "ready", "details": health})))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "not_ready", "details": health})),
        )
    }
}

/// Prometheus text export
async fn metrics_handler(State(app_state): State<AppState>) -> impl IntoResponse {
    let mut output = app_state.metrics.export_prometheus();

    if let Some(circuit_breaker) = &app_state.circuit_breaker {
        output.push('\n');
        output.push_str(&circuit_breaker.export_prometheus("rca_vectordb_breaker").await);
    }

    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        output,
    )
}
