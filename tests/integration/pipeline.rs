//! FSDS files → Z'' scoring → SQLite → HTTP API.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use rust_decimal_macros::dec;
use tower::ServiceExt;

use altman::analysis::diagnose::{diagnose_missing_tags, MissingCause};
use altman::analysis::verifier::verify_filings;
use altman::api::{build_router, routes::ApiState};
use altman::engine::pipeline::run_with_tickers;
use altman::sec::ticker_map::TickerMap;
use altman::storage;
use altman::types::{CanonicalTag, Prediction};
use altman::universe::{write_mapping, MappedCompany};

use crate::fixtures::{self, Filing, PARTIAL};

#[tokio::test]
async fn test_target_year_run_scores_and_stores() {
    let pool = fixtures::memory_db().await;
    let data = fixtures::sample_data_dir();

    let report = run_with_tickers(&pool, data.path(), TickerMap::parse(fixtures::TICKERS), Some(2023))
        .await
        .unwrap();
    assert_eq!(report.quarters, vec!["2024q1"]);
    assert_eq!(report.loaded, 2);
    assert_eq!(report.in_scope, 2);
    assert_eq!(report.saved, 2);

    let alpha = storage::find_company(&pool, "0000001001".parse().unwrap()).await.unwrap();
    assert_eq!(alpha.len(), 1);
    assert_eq!(alpha[0].ticker, "ALPH");
    assert_eq!(alpha[0].z_score, dec!(5.193));
    assert_eq!(alpha[0].prediction, Prediction::Safe);
    assert_eq!(alpha[0].roe, Some(dec!(0.0833)));
    assert_eq!(alpha[0].x5_salesta, Some(dec!(0.9)));
    assert_eq!(alpha[0].eps, None);
    assert_eq!(alpha[0].data_source, "2024q1");

    let beta = storage::find_company(&pool, "1002".parse().unwrap()).await.unwrap();
    assert_eq!(beta[0].z_score, dec!(-2.183));
    assert_eq!(beta[0].prediction, Prediction::Distress);
}

#[tokio::test]
async fn test_rerun_upserts_instead_of_duplicating() {
    let pool = fixtures::memory_db().await;
    let data = fixtures::sample_data_dir();
    let tickers = || TickerMap::parse(fixtures::TICKERS);

    run_with_tickers(&pool, data.path(), tickers(), None).await.unwrap();
    let report = run_with_tickers(&pool, data.path(), tickers(), None).await.unwrap();
    assert_eq!(report.quarters, vec!["2023q1", "2024q1"]);
    assert_eq!(report.saved, 3);

    let summary = storage::prediction_summary(&pool).await.unwrap();
    assert_eq!(summary["Safe"], 1);
    assert_eq!(summary["Distress"], 2);
    assert_eq!(summary["Grey"], 0);
    assert_eq!(summary.values().sum::<i64>(), 3);

    // Newest period first.
    let alpha = storage::find_company(&pool, "1001".parse().unwrap()).await.unwrap();
    assert_eq!(alpha.len(), 2);
    assert_eq!(alpha[0].fiscal_year, 2023);
    assert_eq!(alpha[1].fiscal_year, 2022);

    let runs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pipeline_runs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(runs, 2);
}

#[tokio::test]
async fn test_incomplete_filings_are_not_stored() {
    let pool = fixtures::memory_db().await;
    let data = tempfile::tempdir().unwrap();
    fixtures::write_quarter(
        data.path(),
        "2024q1",
        &[Filing {
            adsh: "0000001003-24-000001",
            cik: "1003",
            name: "GAMMA INC",
            form: "10-K",
            period: "20231231",
            fy: "2023",
            fp: "FY",
            items: PARTIAL,
        }],
    );

    let report = run_with_tickers(&pool, data.path(), TickerMap::default(), Some(2023))
        .await
        .unwrap();
    assert_eq!(report.loaded, 1);
    assert_eq!(report.analysed, 0);
    assert_eq!(report.saved, 0);
    assert!(storage::find_company(&pool, "1003".parse().unwrap()).await.unwrap().is_empty());

    // The diagnosis explains why.
    let diagnosis = diagnose_missing_tags(data.path(), "1003".parse().unwrap())
        .unwrap()
        .unwrap();
    assert!(!diagnosis.is_complete());
    let cause = |tag| {
        diagnosis
            .missing
            .iter()
            .find(|m| m.tag == tag)
            .map(|m| m.cause.clone())
    };
    assert_eq!(
        cause(CanonicalTag::RetainedEarnings),
        Some(MissingCause::UnmappedCandidates(vec!["RetainedEarningsAppropriated".into()]))
    );
    assert_eq!(cause(CanonicalTag::Ebit), Some(MissingCause::NotReported));
    assert_eq!(cause(CanonicalTag::Assets), None);
}

#[tokio::test]
async fn test_stored_results_served_over_api() {
    let pool = fixtures::memory_db().await;
    let data = fixtures::sample_data_dir();
    run_with_tickers(&pool, data.path(), TickerMap::parse(fixtures::TICKERS), None)
        .await
        .unwrap();

    let app = build_router(Arc::new(ApiState { pool }));

    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/api/companies/1001").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
    let rows: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 2);
    assert_eq!(rows[0]["prediction"], "Safe");
    assert_eq!(rows[1]["prediction"], "Distress");

    let resp = app
        .oneshot(Request::builder().uri("/api/summary").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
    let summary: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(summary["total"], 3);
    assert_eq!(summary["by_prediction"]["Incomplete/Invalid"], 0);
}

#[test]
fn test_verify_against_mapping() {
    let data = fixtures::sample_data_dir();
    let mapping = data.path().join("processed").join("sp500_cik_mapping.csv");
    let company = |name: &str, ticker: &str, cik: &str| MappedCompany {
        company_name: name.into(),
        ticker: ticker.into(),
        cik: cik.parse().unwrap(),
    };
    write_mapping(
        &mapping,
        &[
            company("Gamma Inc", "GAMM", "1003"),
            company("Alpha Corp", "ALPH", "1001"),
            company("Beta Holdings", "BETA", "1002"),
        ],
    )
    .unwrap();

    let report = verify_filings(&mapping, data.path(), 2023).unwrap();
    assert_eq!(report.total, 3);
    assert_eq!(report.filed, 2);
    assert_eq!(report.missing.len(), 1);
    assert_eq!(report.missing[0].ticker, "GAMM");
    // 2023q3, 2023q4 and 2024q2 are absent.
    assert_eq!(report.missing_files.len(), 3);
    assert!(report.to_string().contains("Missing Reports:  1"));
}

#[tokio::test]
async fn test_tag_ingest_dedupes_across_quarters() {
    let pool = fixtures::memory_db().await;
    let raw = tempfile::tempdir().unwrap();
    fixtures::write_tags(raw.path(), "2023q4", &["Assets", "Liabilities"]);
    fixtures::write_tags(raw.path(), "2024q1", &["Assets", "Revenues"]);

    let report = storage::ingest_raw_tags(&pool, raw.path()).await.unwrap();
    assert_eq!(report.folders, 2);
    assert_eq!(report.rows, 4);
    assert!(report.failed.is_empty());
    assert_eq!(storage::dedupe_raw_tags(&pool).await.unwrap(), 3);
}
