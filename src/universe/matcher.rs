//! Index constituent → CIK matching.

use anyhow::{Context, Result};
use reqwest::Client;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use super::wikipedia::parse_constituents;
use super::{write_mapping, Constituent, IndexKind, MappedCompany};
use crate::config::AppConfig;
use crate::sec::ticker_map::TickerMap;
use crate::types::PipelineError;

/// Result of mapping one index universe.
#[derive(Debug, Clone, Default)]
pub struct MappingSummary {
    pub total: usize,
    pub mapped: Vec<MappedCompany>,
    /// Tickers with no CIK in the SEC list.
    pub mismatches: Vec<String>,
}

/// Map constituents to CIKs, dropping unmapped tickers. Output is sorted
/// by company name.
pub fn map_constituents(constituents: &[Constituent], tickers: &TickerMap) -> MappingSummary {
    let mut mapped = Vec::new();
    let mut mismatches = Vec::new();
    for c in constituents {
        match tickers.cik_for(&c.ticker) {
            Some(cik) => mapped.push(MappedCompany {
                company_name: c.company_name.clone(),
                ticker: c.ticker.clone(),
                cik,
            }),
            None => mismatches.push(c.ticker.clone()),
        }
    }
    mapped.sort_by(|a, b| a.company_name.cmp(&b.company_name));
    MappingSummary {
        total: constituents.len(),
        mapped,
        mismatches,
    }
}

pub struct CikMatcher {
    http: Client,
    index_urls: HashMap<String, String>,
    output_path: PathBuf,
}

impl CikMatcher {
    pub fn new(cfg: &AppConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.sec.timeout_secs))
            .user_agent(cfg.cik_matcher.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            index_urls: cfg.cik_matcher.index_urls.clone(),
            output_path: cfg.cik_mapping_path(),
        })
    }

    pub fn output_path(&self) -> &PathBuf {
        &self.output_path
    }

    /// Download and parse the constituent table for an index.
    pub async fn fetch_constituents(&self, index: IndexKind) -> Result<Vec<Constituent>> {
        let url = self
            .index_urls
            .get(index.key())
            .ok_or_else(|| PipelineError::UnsupportedIndex(index.to_string()))?;

        info!(%index, url, "Fetching index constituents");
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {url}"))?;
        if !resp.status().is_success() {
            anyhow::bail!("Constituent page returned {}: {url}", resp.status());
        }
        let html = resp.text().await.context("Failed to read constituent page")?;
        parse_constituents(&html).with_context(|| format!("Could not locate the {index} components table"))
    }

    /// Fetch constituents, map them to CIKs and write the mapping CSV.
    pub async fn map_and_save(&self, index: IndexKind, tickers: &TickerMap) -> Result<MappingSummary> {
        let constituents = self.fetch_constituents(index).await?;
        if constituents.is_empty() {
            anyhow::bail!("No tickers found for {index}");
        }

        let summary = map_constituents(&constituents, tickers);
        info!(
            %index,
            total = summary.total,
            mapped = summary.mapped.len(),
            mismatches = summary.mismatches.len(),
            "CIK mapping complete"
        );
        if !summary.mismatches.is_empty() {
            warn!(tickers = ?summary.mismatches, "Tickers without a CIK");
        }

        write_mapping(&self.output_path, &summary.mapped)?;
        info!(path = %self.output_path.display(), "Mapping saved");
        Ok(summary)
    }
}
