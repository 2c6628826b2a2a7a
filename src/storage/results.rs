//! `financial_analysis_results`: one row per (filing, period).

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::collections::BTreeMap;
use tracing::{error, info};

use super::{dec_from_db, dec_to_db};
use crate::types::{AnalysisResult, Cik, Prediction};

const UPSERT: &str = r#"
INSERT INTO financial_analysis_results (
    adsh, cik, name, ticker, period, fiscal_period, fiscal_year,
    x1_wcta, x2_reta, x3_ebitta, x4_mvtl, x5_salesta,
    net_income, total_equity, shares_outstanding,
    z_score, prediction, eps, roe, data_source
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
ON CONFLICT (adsh, period) DO UPDATE SET
    z_score = excluded.z_score,
    prediction = excluded.prediction,
    eps = excluded.eps,
    roe = excluded.roe,
    data_source = excluded.data_source
"#;

/// Upsert results in a single transaction. Any failure rolls back the
/// whole batch.
pub async fn save_results(pool: &SqlitePool, results: &[AnalysisResult]) -> Result<u64> {
    if results.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await.context("Failed to begin transaction")?;
    let mut affected = 0u64;
    for r in results {
        let outcome = sqlx::query(UPSERT)
            .bind(&r.adsh)
            .bind(r.cik.to_string())
            .bind(&r.name)
            .bind(&r.ticker)
            .bind(r.period.to_string())
            .bind(&r.fiscal_period)
            .bind(r.fiscal_year)
            .bind(dec_to_db(r.x1_wcta))
            .bind(dec_to_db(r.x2_reta))
            .bind(dec_to_db(r.x3_ebitta))
            .bind(dec_to_db(r.x4_mvtl))
            .bind(dec_to_db(r.x5_salesta))
            .bind(dec_to_db(r.net_income))
            .bind(dec_to_db(r.total_equity))
            .bind(dec_to_db(r.shares_outstanding))
            .bind(r.z_score.to_string())
            .bind(r.prediction.as_str())
            .bind(dec_to_db(r.eps))
            .bind(dec_to_db(r.roe))
            .bind(&r.data_source)
            .execute(&mut *tx)
            .await;

        match outcome {
            Ok(done) => affected += done.rows_affected(),
            Err(e) => {
                error!(adsh = %r.adsh, error = %e, "Upsert failed, rolling back");
                tx.rollback().await.context("Rollback failed")?;
                return Err(e).context("Failed to save analysis results");
            }
        }
    }
    tx.commit().await.context("Failed to commit analysis results")?;

    info!(rows = results.len(), "Analysis results saved");
    Ok(affected)
}

fn result_from_row(row: &SqliteRow) -> Result<AnalysisResult> {
    let cik: String = row.try_get("cik")?;
    let period: String = row.try_get("period")?;
    let prediction: String = row.try_get("prediction")?;
    let z_score = dec_from_db(row, "z_score")?.unwrap_or_default();

    Ok(AnalysisResult {
        adsh: row.try_get("adsh")?,
        cik: cik.parse()?,
        name: row.try_get("name")?,
        ticker: row.try_get("ticker")?,
        period: NaiveDate::parse_from_str(&period, "%Y-%m-%d")
            .with_context(|| format!("Invalid stored period: {period:?}"))?,
        fiscal_period: row.try_get("fiscal_period")?,
        fiscal_year: row.try_get("fiscal_year")?,
        x1_wcta: dec_from_db(row, "x1_wcta")?,
        x2_reta: dec_from_db(row, "x2_reta")?,
        x3_ebitta: dec_from_db(row, "x3_ebitta")?,
        x4_mvtl: dec_from_db(row, "x4_mvtl")?,
        x5_salesta: dec_from_db(row, "x5_salesta")?,
        net_income: dec_from_db(row, "net_income")?,
        total_equity: dec_from_db(row, "total_equity")?,
        shares_outstanding: dec_from_db(row, "shares_outstanding")?,
        z_score,
        prediction: prediction.parse()?,
        eps: dec_from_db(row, "eps")?,
        roe: dec_from_db(row, "roe")?,
        data_source: row.try_get("data_source")?,
    })
}

/// All stored results for a CIK, newest period first.
pub async fn find_company(pool: &SqlitePool, cik: Cik) -> Result<Vec<AnalysisResult>> {
    let rows = sqlx::query("SELECT * FROM financial_analysis_results WHERE cik = ? ORDER BY period DESC")
        .bind(cik.to_string())
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to query results for CIK {cik}"))?;

    rows.iter().map(result_from_row).collect()
}

/// Number of stored results per prediction zone. Zones with no rows are
/// reported as zero.
pub async fn prediction_summary(pool: &SqlitePool) -> Result<BTreeMap<String, i64>> {
    let rows = sqlx::query(
        "SELECT prediction, COUNT(*) AS n FROM financial_analysis_results GROUP BY prediction",
    )
    .fetch_all(pool)
    .await
    .context("Failed to summarise predictions")?;

    let mut summary: BTreeMap<String, i64> = Prediction::ALL
        .iter()
        .map(|p| (p.as_str().to_string(), 0))
        .collect();
    for row in rows {
        let prediction: String = row.try_get("prediction")?;
        let n: i64 = row.try_get("n")?;
        summary.insert(prediction, n);
    }
    Ok(summary)
}


#[cfg(test)]
mod tests {
    use super::fixtures::result;
    use super::*;
    use crate::storage::memory_pool;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_save_and_find() {
        let pool = memory_pool().await;
        let rows = vec![
            result("A-1", "1001", (2022, 12, 31), dec!(5.193)),
            result("A-2", "1001", (2023, 12, 31), dec!(0.5)),
            result("B-1", "2002", (2023, 12, 31), dec!(2.0)),
        ];
        save_results(&pool, &rows).await.unwrap();

        let found = find_company(&pool, "0000001001".parse().unwrap()).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].adsh, "A-2");
        assert_eq!(found[1], rows[0]);
        assert_eq!(found[0].prediction, Prediction::Distress);
    }

    #[tokio::test]
    async fn test_upsert_keeps_one_row() {
        let pool = memory_pool().await;
        save_results(&pool, &[result("A-1", "1001", (2023, 12, 31), dec!(1.0))])
            .await
            .unwrap();
        let mut updated = result("A-1", "1001", (2023, 12, 31), dec!(3.25));
        updated.data_source = "2024q2".into();
        save_results(&pool, &[updated]).await.unwrap();

        let found = find_company(&pool, "1001".parse().unwrap()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].z_score, dec!(3.25));
        assert_eq!(found[0].prediction, Prediction::Safe);
        assert_eq!(found[0].data_source, "2024q2");
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let pool = memory_pool().await;
        assert_eq!(save_results(&pool, &[]).await.unwrap(), 0);
        assert!(find_company(&pool, "1001".parse().unwrap()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prediction_summary() {
        let pool = memory_pool().await;
        let mut incomplete = result("C-1", "3003", (2023, 12, 31), dec!(0));
        incomplete.prediction = Prediction::Incomplete;
        save_results(
            &pool,
            &[
                result("A-1", "1001", (2023, 12, 31), dec!(5.0)),
                result("B-1", "2002", (2023, 12, 31), dec!(4.0)),
                incomplete,
            ],
        )
        .await
        .unwrap();

        let summary = prediction_summary(&pool).await.unwrap();
        assert_eq!(summary["Safe"], 2);
        assert_eq!(summary["Grey"], 0);
        assert_eq!(summary["Incomplete/Invalid"], 1);
    }
}
