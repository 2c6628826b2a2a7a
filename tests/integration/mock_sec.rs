//! Mock SEC source for integration testing.
//!
//! Serves filings and company facts from in-memory maps, records every
//! request, and can be switched into a failing mode.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use altman::sec::company_facts::CompanyFacts;
use altman::sec::{FactsSource, FilingSource};
use altman::types::Cik;

#[derive(Default)]
pub struct MockSec {
    filings: HashMap<String, String>,
    facts: HashMap<Cik, String>,
    requests: Arc<Mutex<Vec<String>>>,
    /// If set, all operations will return this error.
    force_error: Arc<Mutex<Option<String>>>,
}

impl MockSec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filing(mut self, path: &str, text: &str) -> Self {
        self.filings.insert(path.to_string(), text.to_string());
        self
    }

    pub fn with_facts(mut self, cik: &str, json: &str) -> Self {
        self.facts.insert(cik.parse().unwrap(), json.to_string());
        self
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn check_error(&self) -> Result<()> {
        match self.force_error.lock().unwrap().as_ref() {
            Some(msg) => Err(anyhow!("{msg}")),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl FilingSource for MockSec {
    async fn fetch_filing(&self, path: &str) -> Result<Option<String>> {
        self.requests.lock().unwrap().push(path.to_string());
        self.check_error()?;
        Ok(self.filings.get(path).cloned())
    }
}

#[async_trait]
impl FactsSource for MockSec {
    async fn company_facts(&self, cik: Cik) -> Result<CompanyFacts> {
        self.requests.lock().unwrap().push(format!("facts:{cik}"));
        self.check_error()?;
        let json = self
            .facts
            .get(&cik)
            .ok_or_else(|| anyhow!("404 Not Found: CIK {cik}"))?;
        Ok(serde_json::from_str(json)?)
    }
}
