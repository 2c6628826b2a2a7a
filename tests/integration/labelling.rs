//! 8-K crawl → bankruptcy labelling, and the company facts health check,
//! against the in-memory SEC mock.

use std::sync::Arc;

use rust_decimal_macros::dec;

use altman::engine::health::HealthChecker;
use altman::labels::{last_processed_path, BankruptcyLabeler};
use altman::sec::master_index::{index_file_name, parse_master_index, read_index_csv, write_index_csv};
use altman::storage;
use altman::types::Quarter;
use altman::universe::{read_mapping, write_mapping, MappedCompany};

use crate::fixtures::{self, MASTER_INDEX};
use crate::mock_sec::MockSec;

const ALPHA_8K: &str = "edgar/data/1001/000000100125000004/0000001001-25-000004";
const BETA_8K: &str = "edgar/data/1002/000000100225000007/0000001002-25-000007";
const GAMMA_8K: &str = "edgar/data/1003/000000100325000003/0000001003-25-000003";

fn crawled_index(dir: &std::path::Path) -> std::path::PathBuf {
    let entries = parse_master_index(MASTER_INDEX, "8-K");
    let path = dir.join(index_file_name(Quarter::new(2025, 1).unwrap()));
    write_index_csv(&path, &entries).unwrap();
    path
}

fn sec() -> MockSec {
    MockSec::new()
        .with_filing(ALPHA_8K, "Item 2.02 Results of Operations and Financial Condition")
        .with_filing(BETA_8K, "ITEM 1.03 BANKRUPTCY OR RECEIVERSHIP. On February 12 ...")
        .with_filing(GAMMA_8K, "Item 5.02 Departure of Directors")
}

#[test]
fn test_crawled_index_keeps_exact_8k_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = crawled_index(dir.path());
    assert!(path.ends_with("sec_8k_index_2025_Q1.csv"));

    let entries = read_index_csv(&path).unwrap();
    let paths: Vec<&str> = entries.iter().map(|e| e.file_path.as_str()).collect();
    // 10-Q and 8-K/A rows are dropped.
    assert_eq!(paths, vec![ALPHA_8K, BETA_8K, GAMMA_8K]);
}

#[tokio::test]
async fn test_label_then_resume() {
    let dir = tempfile::tempdir().unwrap();
    let input = crawled_index(dir.path());
    let output = dir.path().join("bankruptcy_labels.csv");

    let source = sec();
    let report = BankruptcyLabeler::new(&source).run(&input, &output).await.unwrap();
    assert_eq!(report.processed, 3);
    assert_eq!(report.found, 1);
    assert_eq!(source.requests(), vec![ALPHA_8K, BETA_8K, GAMMA_8K]);
    assert_eq!(last_processed_path(&output).as_deref(), Some(BETA_8K));

    // A second session resumes after the last labelled filing.
    let source = sec();
    let report = BankruptcyLabeler::new(&source).run(&input, &output).await.unwrap();
    assert!(report.checkpoint_reached);
    assert_eq!(report.found, 0);
    assert_eq!(source.requests(), vec![GAMMA_8K]);

    let text = std::fs::read_to_string(&output).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.ends_with(&format!("1002,8-K,2025-02-14,{BETA_8K},1\n")));
}

#[test]
fn test_source_error_aborts_labelling() {
    let dir = tempfile::tempdir().unwrap();
    let input = crawled_index(dir.path());
    let output = dir.path().join("labels.csv");

    let source = sec();
    source.set_error("connection reset");
    let result = tokio_test::block_on(BankruptcyLabeler::new(&source).run(&input, &output));
    assert!(result.is_err());
    // Only the header was written.
    assert_eq!(last_processed_path(&output), None);
}

const FACTS: &str = r#"{
    "cik": 1001,
    "entityName": "Alpha Corp",
    "facts": {"us-gaap": {
        "Assets": {"units": {"USD": [{"end": "2023-12-31", "val": 1000, "fy": 2023, "fp": "FY", "form": "10-K", "filed": "2024-02-20"}]}},
        "AssetsCurrent": {"units": {"USD": [{"end": "2023-12-31", "val": 500, "fy": 2023, "fp": "FY", "form": "10-K", "filed": "2024-02-20"}]}},
        "LiabilitiesCurrent": {"units": {"USD": [{"end": "2023-12-31", "val": 200, "fy": 2023, "fp": "FY", "form": "10-K", "filed": "2024-02-20"}]}},
        "Liabilities": {"units": {"USD": [{"end": "2023-12-31", "val": 400, "fy": 2023, "fp": "FY", "form": "10-K", "filed": "2024-02-20"}]}},
        "RetainedEarningsAccumulatedDeficit": {"units": {"USD": [{"end": "2023-12-31", "val": 300, "fy": 2023, "fp": "FY", "form": "10-K", "filed": "2024-02-20"}]}},
        "StockholdersEquity": {"units": {"USD": [{"end": "2023-12-31", "val": 600, "fy": 2023, "fp": "FY", "form": "10-K", "filed": "2024-02-20"}]}},
        "OperatingIncomeLoss": {"units": {"USD": [{"start": "2023-01-01", "end": "2023-12-31", "val": 100, "fy": 2023, "fp": "FY", "form": "10-K", "filed": "2024-02-20"}]}}
    }}
}"#;

#[tokio::test]
async fn test_health_check_from_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let mapping = dir.path().join("ndx_cik_mapping.csv");
    let company = |name: &str, ticker: &str, cik: &str| MappedCompany {
        company_name: name.into(),
        ticker: ticker.into(),
        cik: cik.parse().unwrap(),
    };
    write_mapping(
        &mapping,
        &[company("Beta Holdings", "BETA", "1002"), company("Alpha Corp", "ALPH", "1001")],
    )
    .unwrap();
    let companies = read_mapping(&mapping).unwrap();

    let source = Arc::new(MockSec::new().with_facts("0000001001", FACTS));
    let pool = fixtures::memory_db().await;
    let checker = HealthChecker::new(source.clone(), 4);
    let (reports, path) = checker.run(&companies, &pool, dir.path()).await.unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].ticker, "ALPH");
    assert_eq!(reports[0].z_score, Some(dec!(5.19)));
    assert_eq!(reports[1].z_score, None);
    assert_eq!(source.requests().len(), 2);

    let csv = std::fs::read_to_string(path).unwrap();
    assert_eq!(
        csv,
        "company_name,ticker,cik,z_score\nAlpha Corp,ALPH,1001,5.19\nBeta Holdings,BETA,1002,\n"
    );

    let stored = storage::load_health_reports(&pool).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].z_score, Some(dec!(5.19)));
}
