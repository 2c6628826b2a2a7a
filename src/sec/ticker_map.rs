//! Ticker ↔ CIK mapping from the SEC `ticker.txt` list.
//!
//! Format: one `ticker<TAB>cik` pair per line, lowercase tickers,
//! unpadded CIKs. A CIK may appear under several tickers (share classes);
//! the first one listed is used as the display ticker.

use std::collections::HashMap;
use tracing::{error, info};

use super::SecClient;
use crate::types::Cik;

/// Ticker shown for filers without a listed ticker.
pub const UNKNOWN_TICKER: &str = "UNKNOWN";

#[derive(Debug, Clone, Default)]
pub struct TickerMap {
    cik_to_ticker: HashMap<Cik, String>,
    ticker_to_cik: HashMap<String, Cik>,
}

/// Share-class separators differ between sources (`BRK.B` vs `brk-b`).
fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase().replace('.', "-")
}

impl TickerMap {
    /// Parse the contents of `ticker.txt`. Malformed lines are skipped.
    pub fn parse(text: &str) -> Self {
        let mut map = TickerMap::default();
        for line in text.trim().lines() {
            let mut parts = line.split('\t');
            let (Some(ticker), Some(cik)) = (parts.next(), parts.next()) else {
                continue;
            };
            let ticker = ticker.trim().to_uppercase();
            if ticker.is_empty() {
                continue;
            }
            let Ok(cik) = cik.parse::<Cik>() else {
                continue;
            };
            map.cik_to_ticker.entry(cik).or_insert_with(|| ticker.clone());
            map.ticker_to_cik.entry(normalize_ticker(&ticker)).or_insert(cik);
        }
        map
    }

    pub fn ticker_for(&self, cik: Cik) -> Option<&str> {
        self.cik_to_ticker.get(&cik).map(String::as_str)
    }

    /// Ticker for a CIK, or `UNKNOWN`.
    pub fn ticker_or_unknown(&self, cik: Cik) -> String {
        self.ticker_for(cik).unwrap_or(UNKNOWN_TICKER).to_string()
    }

    pub fn cik_for(&self, ticker: &str) -> Option<Cik> {
        self.ticker_to_cik.get(&normalize_ticker(ticker)).copied()
    }

    /// Number of distinct CIKs.
    pub fn len(&self) -> usize {
        self.cik_to_ticker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cik_to_ticker.is_empty()
    }
}

/// Download the ticker map. On failure the error is logged and an empty
/// map returned, so callers fall back to `UNKNOWN` tickers.
pub async fn load_ticker_map(client: &SecClient, url: &str) -> TickerMap {
    info!(url, "Downloading CIK-to-ticker map");
    match client.get_text(url).await {
        Ok(text) => {
            let map = TickerMap::parse(&text);
            info!(count = map.len(), "Loaded CIK-to-ticker mappings");
            map
        }
        Err(e) => {
            error!(error = %e, "Failed to download CIK-to-ticker map");
            TickerMap::default()
        }
    }
}
