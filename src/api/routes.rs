//! API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<ApiState>`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::error;

use crate::storage::{self, HealthReport};
use crate::types::{AnalysisResult, Cik};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct ApiState {
    pub pool: SqlitePool,
}

pub type AppState = Arc<ApiState>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        error!(error = %e, "API request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryResponse {
    pub total: i64,
    pub by_prediction: BTreeMap<String, i64>,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// GET /api/companies/:cik
pub async fn get_company(
    State(state): State<AppState>,
    Path(raw_cik): Path<String>,
) -> Result<Json<Vec<AnalysisResult>>, ApiError> {
    let cik: Cik = raw_cik
        .parse()
        .map_err(|e: crate::types::PipelineError| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;

    let rows = storage::find_company(&state.pool, cik).await?;
    if rows.is_empty() {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("No results for CIK {cik}"),
        ));
    }
    Ok(Json(rows))
}

/// GET /api/summary
pub async fn get_summary(State(state): State<AppState>) -> Result<Json<SummaryResponse>, ApiError> {
    let by_prediction = storage::prediction_summary(&state.pool).await?;
    Ok(Json(SummaryResponse {
        total: by_prediction.values().sum(),
        by_prediction,
    }))
}

/// GET /api/health-reports
pub async fn get_health_reports(
    State(state): State<AppState>,
) -> Result<Json<Vec<HealthReport>>, ApiError> {
    Ok(Json(storage::load_health_reports(&state.pool).await?))
}
