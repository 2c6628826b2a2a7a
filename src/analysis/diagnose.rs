//! Missing-tag diagnosis.
//!
//! Given a CIK, finds its latest annual report in the local FSDS quarters
//! and reports which core Z'' line items could not be mapped, along with
//! raw XBRL tags in the filing that look like unmapped aliases.

use anyhow::Result;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use tracing::info;

use crate::fsds::loader::{latest_annual_filing, load_filing_facts};
use crate::fsds::tags;
use crate::types::{CanonicalTag, Cik};

const MAX_EXAMPLES: usize = 3;

/// Why a core item is missing from a filing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingCause {
    /// The filing carries tags that resemble the item but are not in the
    /// alias map.
    UnmappedCandidates(Vec<String>),
    /// Nothing similar was reported.
    NotReported,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingTag {
    pub tag: CanonicalTag,
    pub cause: MissingCause,
}

/// Diagnosis of one filer's latest annual report.
#[derive(Debug, Clone)]
pub struct TagDiagnosis {
    pub cik: Cik,
    pub name: String,
    pub adsh: String,
    pub fiscal_year: Option<String>,
    pub period: Option<NaiveDate>,
    pub data_source: String,
    pub present: Vec<CanonicalTag>,
    pub missing: Vec<MissingTag>,
}

impl TagDiagnosis {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Raw tags that look like `canonical` but have no alias mapping. A tag
/// matches when it contains the canonical name, or its first three
/// characters, case-insensitively.
fn unmapped_candidates<'a>(canonical: CanonicalTag, raw_tags: &BTreeSet<&'a str>) -> Vec<&'a str> {
    let name = canonical.name().to_lowercase();
    let prefix: String = name.chars().take(3).collect();
    raw_tags
        .iter()
        .copied()
        .filter(|tag| !tags::is_known_alias(tag))
        .filter(|tag| {
            let lower = tag.to_lowercase();
            lower.contains(&name) || lower.contains(&prefix)
        })
        .collect()
}

/// Diagnose the core Z'' items of a filer's latest annual report.
/// Returns `None` when no annual report exists for the CIK.
pub fn diagnose_missing_tags(data_dir: &Path, cik: Cik) -> Result<Option<TagDiagnosis>> {
    let Some((sub, dir)) = latest_annual_filing(data_dir, cik)? else {
        return Ok(None);
    };
    info!(%cik, adsh = %sub.adsh, dir = %dir.name(), "Diagnosing latest annual report");

    let facts = load_filing_facts(&dir, &sub.adsh)?;
    let raw_tags: BTreeSet<&str> = facts.iter().map(|f| f.tag.as_str()).collect();
    let mapped: BTreeSet<CanonicalTag> = raw_tags
        .iter()
        .filter_map(|t| tags::canonicalize(t).map(|(canonical, _)| canonical))
        .collect();

    let mut present: Vec<CanonicalTag> = CanonicalTag::CORE
        .iter()
        .copied()
        .filter(|t| mapped.contains(t))
        .collect();
    present.sort_by_key(|t| t.name());

    let missing = CanonicalTag::CORE
        .iter()
        .copied()
        .filter(|t| !mapped.contains(t))
        .map(|tag| {
            let candidates = unmapped_candidates(tag, &raw_tags);
            let cause = if candidates.is_empty() {
                MissingCause::NotReported
            } else {
                MissingCause::UnmappedCandidates(
                    candidates.into_iter().take(MAX_EXAMPLES).map(String::from).collect(),
                )
            };
            MissingTag { tag, cause }
        })
        .collect();

    Ok(Some(TagDiagnosis {
        cik,
        period: sub.period_date(),
        fiscal_year: sub.fy.clone(),
        name: sub.name,
        adsh: sub.adsh,
        data_source: dir.name(),
        present,
        missing,
    }))
}

impl fmt::Display for TagDiagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- CIK {} ({}) ---", self.cik, self.name)?;
        writeln!(
            f,
            "Latest annual report {} (FY {}, period {}) in {}",
            self.adsh,
            self.fiscal_year.as_deref().unwrap_or("?"),
            self.period.map(|p| p.to_string()).unwrap_or_else(|| "?".into()),
            self.data_source
        )?;
        let present: Vec<&str> = self.present.iter().map(|t| t.name()).collect();
        writeln!(
            f,
            "Core tags found ({}/{}): {}",
            self.present.len(),
            CanonicalTag::CORE.len(),
            present.join(", ")
        )?;

        if self.is_complete() {
            return writeln!(f, "All {} core tags are mapped.", CanonicalTag::CORE.len());
        }
        for m in &self.missing {
            match &m.cause {
                MissingCause::UnmappedCandidates(examples) => {
                    writeln!(f, "  * {}: unmapped tags with similar names: {}", m.tag, examples.join(", "))?;
                    writeln!(f, "    -> add them to the {} alias map", m.tag)?;
                }
                MissingCause::NotReported => {
                    writeln!(f, "  * {}: item may be missing from this report", m.tag)?;
                }
            }
        }
        Ok(())
    }
}
