//! Index universes (NASDAQ-100, S&P 500).
//!
//! Constituents are scraped from Wikipedia, mapped to SEC CIKs and saved
//! as `company_name,ticker,cik` CSV for the verifier and health check.

pub mod matcher;
pub mod wikipedia;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

use crate::types::{Cik, PipelineError};

pub use matcher::CikMatcher;

/// Supported index universes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Ndx,
    Sp500,
}

impl IndexKind {
    pub const ALL: &'static [IndexKind] = &[IndexKind::Ndx, IndexKind::Sp500];

    /// Key used in `[cik_matcher.index_urls]`.
    pub fn key(&self) -> &'static str {
        match self {
            IndexKind::Ndx => "NDX",
            IndexKind::Sp500 => "SP500",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for IndexKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NDX" => Ok(IndexKind::Ndx),
            "SP500" => Ok(IndexKind::Sp500),
            _ => Err(PipelineError::UnsupportedIndex(s.to_string())),
        }
    }
}

/// One index member as listed on Wikipedia.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constituent {
    pub company_name: String,
    pub ticker: String,
}

/// One row of the CIK mapping CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedCompany {
    pub company_name: String,
    pub ticker: String,
    pub cik: Cik,
}

/// Write the mapping CSV, creating parent directories.
pub fn write_mapping(path: &Path, rows: &[MappedCompany]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Deserialize)]
struct MappingRow {
    company_name: String,
    #[serde(default)]
    ticker: String,
    cik: String,
}

/// Read a mapping CSV written by `write_mapping`. Rows with an invalid
/// CIK are skipped with a warning.
pub fn read_mapping(path: &Path) -> Result<Vec<MappedCompany>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Mapping file not found: {}", path.display()))?;
    let mut rows = Vec::new();
    for record in reader.deserialize::<MappingRow>() {
        let row = record.with_context(|| format!("Malformed mapping row in {}", path.display()))?;
        match row.cik.parse::<Cik>() {
            Ok(cik) => rows.push(MappedCompany {
                company_name: row.company_name,
                ticker: row.ticker,
                cik,
            }),
            Err(e) => warn!(ticker = %row.ticker, error = %e, "Skipping mapping row"),
        }
    }
    Ok(rows)
}
