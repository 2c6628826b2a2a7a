//! Read-only HTTP API over stored results.
//!
//! JSON endpoints for the web front end and ad-hoc queries. CORS is open
//! for GET so a local dashboard can call it directly.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use routes::{ApiState, AppState};

/// Serve the API until the process is stopped.
pub async fn serve(pool: SqlitePool, port: u16) -> Result<()> {
    let app = build_router(Arc::new(ApiState { pool }));
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "API server starting on http://localhost:{port}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API port {port}"))?;
    axum::serve(listener, app).await.context("API server error")?;
    Ok(())
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/companies/:cik", get(routes::get_company))
        .route("/api/summary", get(routes::get_summary))
        .route("/api/health-reports", get(routes::get_health_reports))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
