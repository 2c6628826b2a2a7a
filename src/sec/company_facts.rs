//! XBRL company facts (`data.sec.gov/api/xbrl/companyfacts`).
//!
//! The endpoint returns every reported fact for a filer, grouped by
//! taxonomy → concept → unit. We only read `us-gaap` and reduce it to a
//! single annual snapshot of canonical line items.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

use crate::fsds::tags;
use crate::types::CanonicalTag;

const US_GAAP: &str = "us-gaap";

/// Forms accepted as annual reports.
pub const ANNUAL_FORMS: &[&str] = &["10-K", "20-F"];

#[derive(Debug, Clone, Deserialize)]
pub struct CompanyFacts {
    #[serde(default)]
    pub cik: Option<u64>,
    #[serde(rename = "entityName", default)]
    pub entity_name: String,
    #[serde(default)]
    pub facts: HashMap<String, HashMap<String, Concept>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Concept {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub units: HashMap<String, Vec<FactEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FactEntry {
    #[serde(default)]
    pub start: Option<NaiveDate>,
    pub end: NaiveDate,
    pub val: Decimal,
    #[serde(default)]
    pub accn: Option<String>,
    #[serde(default)]
    pub fy: Option<i32>,
    #[serde(default)]
    pub fp: Option<String>,
    #[serde(default)]
    pub form: Option<String>,
    #[serde(default)]
    pub filed: Option<NaiveDate>,
}

impl FactEntry {
    fn is_annual_report(&self) -> bool {
        let form_ok = self
            .form
            .as_deref()
            .is_some_and(|f| ANNUAL_FORMS.contains(&f));
        let fp_ok = self.fp.as_deref().map_or(true, |fp| fp == "FY");
        form_ok && fp_ok
    }

    /// Duration facts spanning roughly one fiscal year.
    fn is_full_year(&self) -> bool {
        match self.start {
            Some(start) => (350..=380).contains(&(self.end - start).num_days()),
            None => true,
        }
    }
}

/// Latest annual values for one filer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnualSnapshot {
    pub period_end: NaiveDate,
    pub values: BTreeMap<CanonicalTag, Decimal>,
}

impl AnnualSnapshot {
    pub fn value(&self, tag: CanonicalTag) -> Option<Decimal> {
        self.values.get(&tag).copied()
    }
}

impl CompanyFacts {
    fn concept_entries<'a>(&'a self, concept: &str) -> impl Iterator<Item = &'a FactEntry> + 'a {
        self.facts
            .get(US_GAAP)
            .and_then(|concepts| concepts.get(concept))
            .into_iter()
            .flat_map(|c| c.units.values())
            .flatten()
    }

    /// Pick the value of a canonical tag at a period end, trying aliases
    /// in rank order and preferring the most recently filed fact.
    fn value_at(&self, tag: CanonicalTag, end: NaiveDate) -> Option<Decimal> {
        tags::aliases(tag).iter().find_map(|alias| {
            self.concept_entries(alias)
                .filter(|e| e.end == end && e.is_annual_report() && e.is_full_year())
                .max_by_key(|e| e.filed)
                .map(|e| e.val)
        })
    }

    /// Reduce the facts to the latest annual period, keyed by the most
    /// recent annual `Assets` balance.
    pub fn annual_snapshot(&self) -> Option<AnnualSnapshot> {
        let period_end = tags::aliases(CanonicalTag::Assets)
            .iter()
            .flat_map(|alias| self.concept_entries(alias))
            .filter(|e| e.is_annual_report())
            .map(|e| e.end)
            .max()?;

        let values = CanonicalTag::ALL
            .iter()
            .filter_map(|tag| self.value_at(*tag, period_end).map(|v| (*tag, v)))
            .collect();

        Some(AnnualSnapshot { period_end, values })
    }
}
