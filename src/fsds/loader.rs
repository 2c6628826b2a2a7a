//! Quarter loading: `sub.txt` + `num.txt` → wide `FilingRecord`s.

use anyhow::Result;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info, warn};

use super::quarters::{discover_quarters, QuarterDir};
use super::reader::{read_facts, read_submissions};
use super::tags;
use super::{NUM_FILE_NAME, SUB_FILE_NAME};
use crate::sec::ticker_map::TickerMap;
use crate::types::{CanonicalTag, Cik, FilingRecord, NumFact, Submission};

/// Ordering key for competing facts of one canonical item; lower wins.
/// Facts dated at the filing's own period beat comparatives, then the
/// preferred alias, then the earliest row in the file.
type Preference = (bool, usize, usize);

/// Load one quarter directory into annual filing records.
///
/// Returns an empty list when either file is missing or the quarter holds
/// no annual (`fp = FY`) submissions.
pub fn load_quarter(dir: &QuarterDir, tickers: &TickerMap) -> Result<Vec<FilingRecord>> {
    let sub_path = dir.path.join(SUB_FILE_NAME);
    let num_path = dir.path.join(NUM_FILE_NAME);
    if !sub_path.exists() || !num_path.exists() {
        warn!(dir = %dir.path.display(), "Quarter directory missing sub.txt or num.txt");
        return Ok(Vec::new());
    }

    let annual: Vec<Submission> = read_submissions(&sub_path)?
        .into_iter()
        .filter(Submission::is_annual)
        .collect();
    if annual.is_empty() {
        return Ok(Vec::new());
    }

    let periods: HashMap<&str, &str> = annual
        .iter()
        .map(|s| (s.adsh.as_str(), s.period.as_str()))
        .collect();

    let facts = read_facts(&num_path, |adsh, tag| {
        periods.contains_key(adsh) && tags::is_known_alias(tag)
    })?;

    let pivot = pivot_facts(&facts, |adsh| periods.get(adsh).copied());
    let source = dir.name();

    let mut records = Vec::new();
    let mut dropped = 0usize;
    for sub in &annual {
        let Some(values) = pivot.get(sub.adsh.as_str()) else {
            continue;
        };
        let (Some(period), Some(fiscal_year)) = (sub.period_date(), sub.fiscal_year()) else {
            dropped += 1;
            continue;
        };
        records.push(FilingRecord {
            adsh: sub.adsh.clone(),
            cik: sub.cik,
            name: sub.name.clone(),
            ticker: tickers.ticker_or_unknown(sub.cik),
            period,
            fiscal_period: sub.fp.clone(),
            fiscal_year,
            data_source: source.clone(),
            values: values.clone(),
        });
    }

    if dropped > 0 {
        debug!(dropped, dir = %source, "Dropped filings with invalid period or fiscal year");
    }
    info!(
        dir = %source,
        annual = annual.len(),
        records = records.len(),
        "Quarter loaded"
    );
    Ok(records)
}

/// Pivot non-dimensional facts into one value per canonical item per
/// filing. `period_of` gives each filing's own balance sheet date.
fn pivot_facts<'a>(
    facts: &'a [NumFact],
    period_of: impl Fn(&str) -> Option<&'a str>,
) -> HashMap<&'a str, BTreeMap<CanonicalTag, Decimal>> {
    let mut best: HashMap<&str, BTreeMap<CanonicalTag, (Preference, Decimal)>> = HashMap::new();

    for (seq, fact) in facts.iter().enumerate() {
        if fact.dimensional {
            continue;
        }
        let (Some(value), Some((canonical, rank))) = (fact.value, tags::canonicalize(&fact.tag)) else {
            continue;
        };
        let off_period = match (fact.ddate.as_deref(), period_of(fact.adsh.as_str())) {
            (Some(ddate), Some(period)) => ddate != period,
            _ => true,
        };
        let pref = (off_period, rank, seq);

        let slot = best.entry(fact.adsh.as_str()).or_default();
        let replace = slot
            .get(&canonical)
            .map_or(true, |(existing, _)| pref < *existing);
        if replace {
            slot.insert(canonical, (pref, value));
        }
    }

    best.into_iter()
        .map(|(adsh, values)| {
            let values = values.into_iter().map(|(tag, (_, v))| (tag, v)).collect();
            (adsh, values)
        })
        .collect()
}

/// Find a filer's most recent annual submission across every quarter
/// directory under `data_dir`, by balance sheet date.
pub fn latest_annual_filing(data_dir: &Path, cik: Cik) -> Result<Option<(Submission, QuarterDir)>> {
    let quarters = discover_quarters(data_dir)?;
    info!(%cik, dirs = quarters.len(), "Scanning quarter directories for latest annual report");

    let mut latest: Option<(Submission, QuarterDir)> = None;
    for dir in quarters {
        let sub_path = dir.path.join(SUB_FILE_NAME);
        if !sub_path.exists() {
            continue;
        }
        let subs = match read_submissions(&sub_path) {
            Ok(subs) => subs,
            Err(e) => {
                warn!(dir = %dir.name(), error = %e, "Skipping unreadable sub.txt");
                continue;
            }
        };
        for sub in subs {
            if sub.cik != cik || !sub.is_annual() {
                continue;
            }
            let Some(period) = sub.period_date() else {
                continue;
            };
            let newer = match &latest {
                Some((current, _)) => current.period_date().map_or(true, |p| period > p),
                None => true,
            };
            if newer {
                latest = Some((sub, dir.clone()));
            }
        }
    }
    Ok(latest)
}

/// All non-dimensional facts reported in one filing.
pub fn load_filing_facts(dir: &QuarterDir, adsh: &str) -> Result<Vec<NumFact>> {
    let facts = read_facts(&dir.path.join(NUM_FILE_NAME), |a, _| a == adsh)?;
    Ok(facts.into_iter().filter(|f| !f.dimensional).collect())
}
