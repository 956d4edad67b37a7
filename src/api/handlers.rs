//! API request handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::{
    error::ErrorCategory,
    observability::{HealthChecker, MetricsCollector},
    rag::{PromptRequest, PromptResponse, RcaPipeline, TempestReportRequest},
    tempest::TempestAnalyzer,
    vector_db::CircuitBreaker,
};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RcaPipeline>,
    pub analyzer: Arc<TempestAnalyzer>,
    pub health_checker: Arc<HealthChecker>,
    pub metrics: Arc<MetricsCollector>,
    pub circuit_breaker: Option<Arc<CircuitBreaker>>,
}

/// Generic error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: String) -> axum::response::Response {
    (status, Json(ErrorResponse { error })).into_response()
}

/// Answer a prompt. Always 200; failures are reported in the body
pub async fn prompt(
    State(state): State<AppState>,
    body: Result<Json<PromptRequest>, JsonRejection>,
) -> Json<PromptResponse> {
    match body {
        Ok(Json(request)) => Json(state.pipeline.handle_prompt(request).await),
        Err(rejection) => {
            warn!("Rejected prompt body: {}", rejection.body_text());
            Json(PromptResponse::Failure {
                error: rejection.body_text(),
            })
        }
    }
}

/// Analyse every failing test of a Tempest report
pub async fn rca_from_tempest(
    State(state): State<AppState>,
    body: Result<Json<TempestReportRequest>, JsonRejection>,
) -> axum::response::Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return error_response(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text());
        }
    };

    match state.analyzer.analyze_report(&request.tempest_report_url).await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => {
            let status = match e.category() {
                ErrorCategory::Validation => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCategory::Fetch => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            warn!("Tempest analysis of {} failed: {}", request.tempest_report_url, e);
            error_response(status, e.to_string())
        }
    }
}
