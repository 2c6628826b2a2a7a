//! Bulk FSDS analysis run.
//!
//! ticker map → quarter selection → load → fiscal year filter →
//! Z'' scoring → upsert → run record.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::AppContext;
use crate::analysis::zscore;
use crate::fsds::loader::load_quarter;
use crate::fsds::quarters::{discover_quarters, select_for_year, QuarterDir};
use crate::sec::ticker_map::{load_ticker_map, TickerMap};
use crate::storage::{self, RunRecord};
use crate::types::FilingRecord;

/// Outcome of one bulk run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub run_id: uuid::Uuid,
    pub target_year: Option<i32>,
    pub quarters: Vec<String>,
    /// Annual filings loaded across all selected quarters.
    pub loaded: usize,
    /// Filings left after the fiscal year filter.
    pub in_scope: usize,
    /// Filings with every item Z'' needs.
    pub analysed: usize,
    pub saved: usize,
}

/// Run the pipeline with the SEC ticker list.
pub async fn run(ctx: &AppContext, target_year: Option<i32>) -> Result<PipelineReport> {
    info!("Loading SEC ticker map");
    let tickers = load_ticker_map(&ctx.sec, &ctx.config.sec.ticker_map_url).await;
    run_with_tickers(&ctx.pool, &ctx.config.paths.data_dir, tickers, target_year).await
}

/// Load one quarter off the async runtime.
async fn load_quarter_blocking(dir: QuarterDir, tickers: Arc<TickerMap>) -> Result<Vec<FilingRecord>> {
    tokio::task::spawn_blocking(move || load_quarter(&dir, &tickers))
        .await
        .context("Quarter loader task panicked")?
}

pub async fn run_with_tickers(
    pool: &SqlitePool,
    data_dir: &Path,
    tickers: TickerMap,
    target_year: Option<i32>,
) -> Result<PipelineReport> {
    let mut run = RunRecord::start(target_year);
    info!(run_id = %run.run_id, ?target_year, dir = %data_dir.display(), "Pipeline run started");

    let dirs = match target_year {
        Some(year) => select_for_year(data_dir, year)?,
        None => discover_quarters(data_dir)?,
    };
    let quarters: Vec<String> = dirs.iter().map(QuarterDir::name).collect();

    let mut report = PipelineReport {
        run_id: run.run_id,
        target_year,
        quarters,
        loaded: 0,
        in_scope: 0,
        analysed: 0,
        saved: 0,
    };
    if dirs.is_empty() {
        warn!(dir = %data_dir.display(), "No quarter directories found");
        return Ok(report);
    }

    let tickers = Arc::new(tickers);
    let mut records = Vec::new();
    for dir in dirs {
        let name = dir.name();
        match load_quarter_blocking(dir, Arc::clone(&tickers)).await {
            Ok(mut loaded) => records.append(&mut loaded),
            Err(e) => error!(dir = %name, error = %e, "Error loading quarter, skipping"),
        }
    }
    report.loaded = records.len();
    info!(records = report.loaded, "Loaded annual filings");

    if let Some(year) = target_year {
        records.retain(|r| r.fiscal_year == year);
        if records.is_empty() {
            warn!(year, "No filings for target fiscal year");
            return Ok(report);
        }
    }
    report.in_scope = records.len();

    let results = zscore::compute_batch(&records);
    report.analysed = results.len();
    info!(analysed = report.analysed, "Z'' scores computed");

    if !results.is_empty() {
        storage::save_results(pool, &results).await?;
        report.saved = results.len();
    }

    run.loaded = report.loaded;
    run.saved = report.saved;
    run.finished_at = Utc::now();
    storage::record_run(pool, &run).await?;

    info!(
        run_id = %run.run_id,
        loaded = report.loaded,
        in_scope = report.in_scope,
        saved = report.saved,
        "Pipeline run complete"
    );
    Ok(report)
}
