//! EDGAR full-index (`master.idx`) crawling.
//!
//! URL: `https://www.sec.gov/Archives/edgar/full-index/{year}/QTR{q}/master.idx`
//! Body: a free-text preamble, then `|`-separated rows of
//! `CIK|Company Name|Form Type|Date Filed|Filename`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use super::SecClient;
use crate::types::Quarter;

/// Column names of the filtered index CSV.
pub const INDEX_FIELDS: [&str; 4] = ["CIK", "Form Type", "Filing Date", "File Path"];

/// One filing listed in the master index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    #[serde(rename = "CIK")]
    pub cik: String,
    #[serde(rename = "Form Type")]
    pub form_type: String,
    #[serde(rename = "Filing Date")]
    pub filing_date: String,
    /// Archive path without extension:
    /// `edgar/data/{cik}/{accession-no-dashes}/{accession}`.
    #[serde(rename = "File Path")]
    pub file_path: String,
}

pub fn master_index_url(quarter: Quarter) -> String {
    format!(
        "https://www.sec.gov/Archives/edgar/full-index/{}/QTR{}/master.idx",
        quarter.year, quarter.quarter
    )
}

/// Build the archive path for a master-index filename such as
/// `edgar/data/1000045/0000950170-23-000123.txt`.
fn archive_path(cik: &str, filename: &str) -> Option<String> {
    let name = filename.trim().rsplit('/').next()?;
    let accession = name.strip_suffix(".txt").unwrap_or(name);
    if accession.is_empty() {
        return None;
    }
    let compact = accession.replace('-', "");
    Some(format!("edgar/data/{cik}/{compact}/{accession}"))
}

/// Keep the rows of a master index whose form type equals `form` exactly.
pub fn parse_master_index(text: &str, form: &str) -> Vec<IndexEntry> {
    text.lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split('|').collect();
            if parts.len() < 5 || parts[2].trim() != form {
                return None;
            }
            let cik = parts[0].trim();
            let file_path = archive_path(cik, parts[4])?;
            Some(IndexEntry {
                cik: cik.to_string(),
                form_type: parts[2].trim().to_string(),
                filing_date: parts[3].trim().to_string(),
                file_path,
            })
        })
        .collect()
}

/// Write entries as a `|`-delimited CSV with a header row.
pub fn write_index_csv(path: &Path, entries: &[IndexEntry]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'|')
        .from_path(path)
        .with_context(|| format!("Failed to create index file {}", path.display()))?;
    if entries.is_empty() {
        writer.write_record(INDEX_FIELDS)?;
    }
    for entry in entries {
        writer.serialize(entry)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a `|`-delimited index CSV written by [`write_index_csv`].
/// Rows that fail to deserialize are skipped.
pub fn read_index_csv(path: &Path) -> Result<Vec<IndexEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'|')
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open index file {}", path.display()))?;
    Ok(reader.deserialize().filter_map(|r| r.ok()).collect())
}

/// Output file for a crawled quarter.
pub fn index_file_name(quarter: Quarter) -> String {
    format!("sec_8k_index_{}_Q{}.csv", quarter.year, quarter.quarter)
}

/// Download a quarter's master index, keep 8-K rows and save them.
pub async fn crawl_8k_index(
    client: &SecClient,
    quarter: Quarter,
    out_dir: &Path,
) -> Result<(PathBuf, usize)> {
    let url = master_index_url(quarter);
    info!(%quarter, url = %url, "Downloading master index");

    let text = client
        .get_text(&url)
        .await
        .context("Master index download failed; check the SEC user agent")?;

    let entries = parse_master_index(&text, "8-K");
    let path = out_dir.join(index_file_name(quarter));
    write_index_csv(&path, &entries)?;

    info!(count = entries.len(), path = %path.display(), "8-K index saved");
    Ok((path, entries.len()))
}
