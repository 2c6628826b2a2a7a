//! `financial_health_reports`: the latest health check, one row per
//! universe member. Each run replaces the previous snapshot.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::info;

use super::{dec_from_db, dec_to_db};
use crate::types::Cik;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub company_name: String,
    pub ticker: String,
    pub cik: Cik,
    /// `None` when the score could not be computed.
    pub z_score: Option<Decimal>,
}

/// Replace the stored snapshot with `reports`.
pub async fn replace_health_reports(pool: &SqlitePool, reports: &[HealthReport]) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;
    sqlx::query("DELETE FROM financial_health_reports")
        .execute(&mut *tx)
        .await
        .context("Failed to clear health reports")?;
    for r in reports {
        sqlx::query(
            "INSERT INTO financial_health_reports (company_name, ticker, cik, z_score) VALUES (?, ?, ?, ?)",
        )
        .bind(&r.company_name)
        .bind(&r.ticker)
        .bind(r.cik.to_string())
        .bind(dec_to_db(r.z_score))
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to insert health report for {}", r.ticker))?;
    }
    tx.commit().await.context("Failed to commit health reports")?;

    info!(rows = reports.len(), "Health reports saved");
    Ok(())
}

/// The stored snapshot, ordered by company name.
pub async fn load_health_reports(pool: &SqlitePool) -> Result<Vec<HealthReport>> {
    let rows = sqlx::query("SELECT * FROM financial_health_reports ORDER BY company_name")
        .fetch_all(pool)
        .await
        .context("Failed to query health reports")?;

    rows.iter()
        .map(|row| -> Result<HealthReport> {
            let cik: String = row.try_get("cik")?;
            Ok(HealthReport {
                company_name: row.try_get("company_name")?,
                ticker: row.try_get("ticker")?,
                cik: cik.parse()?,
                z_score: dec_from_db(row, "z_score")?,
            })
        })
        .collect()
}
