//! Rate-limited HTTP client for SEC endpoints.
//!
//! SEC fair-access rules: a declared `User-Agent` identifying the caller
//! and no more than ~10 requests/second. Every request made through this
//! client waits on a shared throttle so concurrent tasks stay under the
//! limit together.
//!
//! Archives: `https://www.sec.gov/Archives/{path}`
//! Company facts: `https://data.sec.gov/api/xbrl/companyfacts/CIK##########.json`

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::company_facts::CompanyFacts;
use super::{FactsSource, FilingSource, ARCHIVES_BASE_URL};
use crate::config::SecConfig;
use crate::types::{Cik, PipelineError};

const COMPANY_FACTS_BASE_URL: &str = "https://data.sec.gov/api/xbrl/companyfacts";

pub struct SecClient {
    http: Client,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl SecClient {
    pub fn new(cfg: &SecConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("Failed to build SEC HTTP client")?;

        Ok(Self {
            http,
            min_interval: Duration::from_millis(cfg.request_delay_ms),
            last_request: Mutex::new(None),
        })
    }

    /// Wait until at least `min_interval` has passed since the previous
    /// request issued by this client.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        self.throttle().await;
        debug!(url, "SEC request");
        self.http
            .get(url)
            .send()
            .await
            .with_context(|| format!("SEC request failed: {url}"))
    }

    /// GET a URL and return its body, failing on any non-2xx status.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let resp = self.get(url).await?;
        if !resp.status().is_success() {
            return Err(PipelineError::Sec {
                url: url.to_string(),
                message: resp.status().to_string(),
            }
            .into());
        }
        resp.text()
            .await
            .with_context(|| format!("Failed to read SEC response body: {url}"))
    }

    /// Fetch a filing, returning the body on 200 and the status otherwise.
    async fn try_filing_url(&self, url: &str) -> Result<std::result::Result<String, StatusCode>> {
        let resp = self.get(url).await?;
        let status = resp.status();
        if status == StatusCode::OK {
            let body = resp
                .text()
                .await
                .with_context(|| format!("Failed to read filing body: {url}"))?;
            Ok(Ok(body))
        } else {
            Ok(Err(status))
        }
    }

    async fn fetch_filing_inner(&self, path: &str) -> Result<Option<String>> {
        let primary = format!("{ARCHIVES_BASE_URL}/{path}.txt");
        match self.try_filing_url(&primary).await? {
            Ok(body) => Ok(Some(body)),
            Err(StatusCode::NOT_FOUND) => {
                let alternate = format!("{ARCHIVES_BASE_URL}/{path}");
                match self.try_filing_url(&alternate).await? {
                    Ok(body) => Ok(Some(body)),
                    Err(status) => {
                        debug!(path, %status, "Filing not found under either URL");
                        Ok(None)
                    }
                }
            }
            Err(status) => {
                warn!(url = %primary, %status, "Filing download failed");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl FilingSource for SecClient {
    async fn fetch_filing(&self, path: &str) -> Result<Option<String>> {
        match self.fetch_filing_inner(path).await {
            Ok(text) => Ok(text),
            Err(e) => {
                warn!(path, error = %e, "Error during filing download");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl FactsSource for SecClient {
    async fn company_facts(&self, cik: Cik) -> Result<CompanyFacts> {
        let url = company_facts_url(cik);
        let body = self.get_text(&url).await?;
        serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse company facts for CIK {cik}"))
    }
}

/// Company facts endpoint for a CIK.
pub fn company_facts_url(cik: Cik) -> String {
    format!("{COMPANY_FACTS_BASE_URL}/CIK{}.json", cik.padded())
}
