//! Universe health check from XBRL company facts.
//!
//! A lighter Z'' than the bulk run: it works from each filer's latest
//! annual snapshot, tolerates missing retained earnings and equity
//! (scored as zero) and reports the score to two decimals.

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use sqlx::sqlite::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::analysis::zscore;
use crate::sec::company_facts::AnnualSnapshot;
use crate::sec::FactsSource;
use crate::storage::{self, HealthReport};
use crate::types::CanonicalTag;
use crate::universe::MappedCompany;

pub const HEALTH_REPORT_FILE_NAME: &str = "health_report.csv";

/// Z'' from an annual snapshot, rounded to two decimals.
///
/// `None` when assets, current assets, current liabilities, total
/// liabilities or EBIT is missing, assets or liabilities are zero, or
/// the score overflows.
pub fn health_z_score(snapshot: &AnnualSnapshot) -> Option<Decimal> {
    let assets = snapshot.value(CanonicalTag::Assets)?;
    let current_assets = snapshot.value(CanonicalTag::AssetsCurrent)?;
    let current_liabilities = snapshot.value(CanonicalTag::LiabilitiesCurrent)?;
    let liabilities = snapshot.value(CanonicalTag::Liabilities)?;
    let ebit = snapshot.value(CanonicalTag::Ebit)?;
    let retained = snapshot
        .value(CanonicalTag::RetainedEarnings)
        .unwrap_or(Decimal::ZERO);
    let equity = snapshot
        .value(CanonicalTag::StockholdersEquity)
        .unwrap_or(Decimal::ZERO);

    let x1 = current_assets.checked_sub(current_liabilities)?.checked_div(assets)?;
    let x2 = retained.checked_div(assets)?;
    let x3 = ebit.checked_div(assets)?;
    let x4 = equity.checked_div(liabilities)?;

    Some(zscore::weighted_sum(x1, x2, x3, x4)?.round_dp(2))
}

pub struct HealthChecker {
    source: Arc<dyn FactsSource>,
    concurrency: usize,
}

impl HealthChecker {
    pub fn new(source: Arc<dyn FactsSource>, concurrency: usize) -> Self {
        Self {
            source,
            concurrency: concurrency.max(1),
        }
    }

    /// Score one company. Failures are logged and yield `None`.
    async fn score(&self, company: &MappedCompany) -> Option<Decimal> {
        let facts = match self.source.company_facts(company.cik).await {
            Ok(facts) => facts,
            Err(e) => {
                warn!(ticker = %company.ticker, error = %e, "Company facts unavailable");
                return None;
            }
        };
        let Some(snapshot) = facts.annual_snapshot() else {
            warn!(ticker = %company.ticker, "No annual report in company facts");
            return None;
        };
        let z = health_z_score(&snapshot);
        debug!(ticker = %company.ticker, period = %snapshot.period_end, ?z, "Health scored");
        z
    }

    /// Score every company with bounded concurrency. Output is ordered by
    /// company name.
    pub async fn check_all(&self, companies: &[MappedCompany]) -> Vec<HealthReport> {
        info!(companies = companies.len(), concurrency = self.concurrency, "Starting health check");

        let mut reports: Vec<HealthReport> = stream::iter(companies)
            .map(|c| async move {
                HealthReport {
                    company_name: c.company_name.clone(),
                    ticker: c.ticker.clone(),
                    cik: c.cik,
                    z_score: self.score(c).await,
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        reports.sort_by(|a, b| a.company_name.cmp(&b.company_name));

        let scored = reports.iter().filter(|r| r.z_score.is_some()).count();
        info!(scored, failed = reports.len() - scored, "Health check complete");
        reports
    }

    /// Check all companies, replace the stored snapshot and write
    /// `health_report.csv` under `out_dir`.
    pub async fn run(
        &self,
        companies: &[MappedCompany],
        pool: &SqlitePool,
        out_dir: &Path,
    ) -> Result<(Vec<HealthReport>, PathBuf)> {
        let reports = self.check_all(companies).await;
        storage::replace_health_reports(pool, &reports).await?;
        let path = out_dir.join(HEALTH_REPORT_FILE_NAME);
        write_health_csv(&path, &reports)?;
        info!(path = %path.display(), "Health report written");
        Ok((reports, path))
    }
}

pub fn write_health_csv(path: &Path, reports: &[HealthReport]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(["company_name", "ticker", "cik", "z_score"])?;
    for r in reports {
        writer.write_record([
            r.company_name.clone(),
            r.ticker.clone(),
            r.cik.to_string(),
            r.z_score.map(|z| z.to_string()).unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
