//! `pipeline_runs`: an audit row per bulk analysis run.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub target_year: Option<i32>,
    pub loaded: usize,
    pub saved: usize,
}

impl RunRecord {
    pub fn start(target_year: Option<i32>) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            target_year,
            loaded: 0,
            saved: 0,
        }
    }
}

pub async fn record_run(pool: &SqlitePool, run: &RunRecord) -> Result<()> {
    sqlx::query(
        "INSERT INTO pipeline_runs (run_id, started_at, finished_at, target_year, loaded, saved) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(run.run_id.to_string())
    .bind(run.started_at.to_rfc3339())
    .bind(run.finished_at.to_rfc3339())
    .bind(run.target_year)
    .bind(run.loaded as i64)
    .bind(run.saved as i64)
    .execute(pool)
    .await
    .context("Failed to record pipeline run")?;
    Ok(())
}
