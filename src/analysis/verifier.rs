//! Annual report filing verification.
//!
//! Checks which members of an index universe have an annual report
//! (10-K or 20-F) in the FSDS submissions filed during the window that
//! fiscal year reports normally land in: Q3 of the fiscal year through
//! Q2 of the next.

use anyhow::Result;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::fsds::reader::read_cik_forms;
use crate::fsds::SUB_FILE_NAME;
use crate::sec::company_facts::ANNUAL_FORMS;
use crate::types::{Cik, Quarter};
use crate::universe::{read_mapping, MappedCompany};

/// `sub.txt` paths searched for fiscal year `fy`.
pub fn quarterly_sub_paths(raw_dir: &Path, fy: i32) -> Vec<PathBuf> {
    [(fy, 3u8), (fy, 4), (fy + 1, 1), (fy + 1, 2)]
        .into_iter()
        .map(|(year, quarter)| {
            raw_dir
                .join(Quarter { year, quarter }.to_string())
                .join(SUB_FILE_NAME)
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct VerificationReport {
    pub fiscal_year: i32,
    pub total: usize,
    pub filed: usize,
    /// Universe members with no annual report, sorted by company name.
    pub missing: Vec<MappedCompany>,
    /// Quarter files that were not on disk.
    pub missing_files: Vec<PathBuf>,
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "===== Filing Verification Summary (FY {}) =====", self.fiscal_year)?;
        writeln!(f, "Total Companies:  {}", self.total)?;
        writeln!(f, "Filed Reports:    {}", self.filed)?;
        writeln!(f, "Missing Reports:  {}", self.missing.len())?;
        for m in &self.missing {
            writeln!(f, "  {:>10}  {}", m.cik, m.company_name)?;
        }
        Ok(())
    }
}

/// Compare the universe in `mapping_csv` against annual report filers.
/// A missing mapping file is an error; missing quarter files are warned
/// about and skipped.
pub fn verify_filings(mapping_csv: &Path, raw_dir: &Path, fy: i32) -> Result<VerificationReport> {
    info!(fy, "Verifying annual report filings");
    let universe = read_mapping(mapping_csv)?;
    let required: HashSet<Cik> = universe.iter().map(|m| m.cik).collect();

    let mut filed_ciks: HashSet<Cik> = HashSet::new();
    let mut missing_files = Vec::new();
    for path in quarterly_sub_paths(raw_dir, fy) {
        if !path.exists() {
            warn!(path = %path.display(), "Data file missing");
            missing_files.push(path);
            continue;
        }
        filed_ciks.extend(
            read_cik_forms(&path)?
                .into_iter()
                .filter(|(_, form)| ANNUAL_FORMS.contains(&form.as_str()))
                .map(|(cik, _)| cik),
        );
    }

    let filed = required.intersection(&filed_ciks).count();

    let mut seen = HashSet::new();
    let mut missing: Vec<MappedCompany> = universe
        .into_iter()
        .filter(|m| !filed_ciks.contains(&m.cik) && seen.insert(m.cik))
        .collect();
    missing.sort_by(|a, b| a.company_name.cmp(&b.company_name));

    info!(fy, total = required.len(), filed, missing = missing.len(), "Verification complete");
    Ok(VerificationReport {
        fiscal_year: fy,
        total: required.len(),
        filed,
        missing,
        missing_files,
    })
}
