//! SEC EDGAR access.
//!
//! Defines the `FilingSource` and `FactsSource` traits and the
//! rate-limited `SecClient` that implements them against:
//! - EDGAR Archives (raw filing text)
//! - EDGAR full-index (`master.idx`)
//! - XBRL company facts API (`data.sec.gov`)
//! - the SEC ticker ↔ CIK list

pub mod client;
pub mod company_facts;
pub mod master_index;
pub mod ticker_map;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::Cik;
use company_facts::CompanyFacts;

pub use client::SecClient;

/// Base URL for EDGAR archive paths (`edgar/data/...`).
pub const ARCHIVES_BASE_URL: &str = "https://www.sec.gov/Archives";

/// Abstraction over where raw filing documents come from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FilingSource: Send + Sync {
    /// Fetch the full text of a filing by its archive path.
    ///
    /// Returns `Ok(None)` when the filing could not be retrieved; callers
    /// treat that as "no text" and move on.
    async fn fetch_filing(&self, path: &str) -> Result<Option<String>>;
}

/// Abstraction over the XBRL company facts API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FactsSource: Send + Sync {
    async fn company_facts(&self, cik: Cik) -> Result<CompanyFacts>;
}
