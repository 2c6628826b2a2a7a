//! Persistence layer.
//!
//! SQLite via `sqlx`. Decimal values are stored as their exact string
//! form and dates as ISO `YYYY-MM-DD` text, so nothing is lost to
//! floating point and `ORDER BY period` sorts chronologically.
//!
//! - `results`: `financial_analysis_results` (Z'' rows, upsert by filing)
//! - `health`: `financial_health_reports` (latest health check snapshot)
//! - `tags`: `raw_tags` (FSDS tag dictionary)
//! - `runs`: `pipeline_runs` (one row per bulk run)

pub mod health;
pub mod results;
pub mod runs;
pub mod tags;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::info;

pub use health::{load_health_reports, replace_health_reports, HealthReport};
pub use results::{find_company, prediction_summary, save_results};
pub use runs::{record_run, RunRecord};
pub use tags::{dedupe_raw_tags, ingest_raw_tags, TagIngestReport};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS financial_analysis_results (
    adsh               TEXT NOT NULL,
    cik                TEXT NOT NULL,
    name               TEXT NOT NULL,
    ticker             TEXT NOT NULL,
    period             TEXT NOT NULL,
    fiscal_period      TEXT NOT NULL,
    fiscal_year        INTEGER NOT NULL,
    x1_wcta            TEXT,
    x2_reta            TEXT,
    x3_ebitta          TEXT,
    x4_mvtl            TEXT,
    x5_salesta         TEXT,
    net_income         TEXT,
    total_equity       TEXT,
    shares_outstanding TEXT,
    z_score            TEXT NOT NULL,
    prediction         TEXT NOT NULL,
    eps                TEXT,
    roe                TEXT,
    data_source        TEXT NOT NULL,
    PRIMARY KEY (adsh, period)
);

CREATE INDEX IF NOT EXISTS idx_results_cik ON financial_analysis_results (cik);

CREATE TABLE IF NOT EXISTS financial_health_reports (
    company_name TEXT NOT NULL,
    ticker       TEXT NOT NULL,
    cik          TEXT NOT NULL,
    z_score      TEXT
);

CREATE TABLE IF NOT EXISTS raw_tags (
    tag      TEXT NOT NULL,
    version  TEXT,
    custom   TEXT,
    abstract TEXT,
    datatype TEXT,
    iord     TEXT,
    crdr     TEXT,
    tlabel   TEXT,
    doc      TEXT
);

CREATE TABLE IF NOT EXISTS pipeline_runs (
    run_id      TEXT PRIMARY KEY,
    started_at  TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    target_year INTEGER,
    loaded      INTEGER NOT NULL,
    saved       INTEGER NOT NULL
);
"#;

/// Open a connection pool. File databases are created if missing.
pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("Invalid database URL: {url}"))?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to database: {url}"))?;

    info!(url, "Database connected");
    Ok(pool)
}

/// Create tables and indexes if they do not exist.
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .context("Failed to create schema")?;
    Ok(())
}

/// Connect and migrate in one step.
pub async fn open(url: &str, max_connections: u32) -> Result<SqlitePool> {
    let pool = connect(url, max_connections).await?;
    migrate(&pool).await?;
    Ok(pool)
}

// ---------------------------------------------------------------------------
// Column helpers
// ---------------------------------------------------------------------------

fn dec_to_db(value: Option<Decimal>) -> Option<String> {
    value.map(|d| d.to_string())
}

fn dec_from_db(row: &SqliteRow, column: &str) -> Result<Option<Decimal>> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| {
        Decimal::from_str(&s).with_context(|| format!("Invalid decimal in column {column}: {s:?}"))
    })
    .transpose()
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    // A single connection keeps every query on the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    migrate(&pool).await.unwrap();
    pool
}
