//! Shared types for the ALTMAN pipeline.
//!
//! These types form the data model used across all modules.
//! They are kept free of I/O so that the SEC, FSDS, analysis and
//! storage modules can depend on them without circular references.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// SEC Central Index Key.
///
/// Stored as a number so that `"0000320193"` and `"320193"` compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "CikRepr", into = "String")]
pub struct Cik(u64);

#[derive(Deserialize)]
#[serde(untagged)]
enum CikRepr {
    Num(u64),
    Text(String),
}

impl Cik {
    pub fn new(value: u64) -> Result<Self, PipelineError> {
        if value == 0 {
            return Err(PipelineError::InvalidCik(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Ten-digit, zero-padded form used by the EDGAR APIs.
    pub fn padded(&self) -> String {
        format!("{:010}", self.0)
    }
}

impl FromStr for Cik {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        // FSDS exports occasionally carry float-formatted ids ("320193.0").
        let digits = trimmed.strip_suffix(".0").unwrap_or(trimmed);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PipelineError::InvalidCik(s.to_string()));
        }
        let value = digits
            .parse::<u64>()
            .map_err(|_| PipelineError::InvalidCik(s.to_string()))?;
        Cik::new(value).map_err(|_| PipelineError::InvalidCik(s.to_string()))
    }
}

impl TryFrom<CikRepr> for Cik {
    type Error = PipelineError;

    fn try_from(repr: CikRepr) -> Result<Self, Self::Error> {
        match repr {
            CikRepr::Num(n) => Cik::new(n),
            CikRepr::Text(s) => s.parse(),
        }
    }
}

impl From<Cik> for String {
    fn from(cik: Cik) -> Self {
        cik.to_string()
    }
}

impl fmt::Display for Cik {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A quarterly FSDS release, named on disk as `YYYYqN` (e.g. `2023q4`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Quarter {
    pub year: i32,
    pub quarter: u8,
}

impl Quarter {
    pub fn new(year: i32, quarter: u8) -> Result<Self, PipelineError> {
        if !(1..=4).contains(&quarter) {
            return Err(PipelineError::InvalidQuarter(format!("{year}q{quarter}")));
        }
        Ok(Self { year, quarter })
    }
}

impl FromStr for Quarter {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let (year, quarter) = lower
            .split_once('q')
            .ok_or_else(|| PipelineError::InvalidQuarter(s.to_string()))?;
        if year.len() != 4 || quarter.len() != 1 {
            return Err(PipelineError::InvalidQuarter(s.to_string()));
        }
        let year = year
            .parse::<i32>()
            .map_err(|_| PipelineError::InvalidQuarter(s.to_string()))?;
        let quarter = quarter
            .parse::<u8>()
            .map_err(|_| PipelineError::InvalidQuarter(s.to_string()))?;
        Quarter::new(year, quarter)
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}q{}", self.year, self.quarter)
    }
}

// ---------------------------------------------------------------------------
// Canonical line items
// ---------------------------------------------------------------------------

/// Normalised financial line item. Raw XBRL tags are mapped onto these
/// by `fsds::tags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CanonicalTag {
    Assets,
    LiabilitiesCurrent,
    AssetsCurrent,
    RetainedEarnings,
    Ebit,
    Liabilities,
    Revenues,
    StockholdersEquity,
    NetIncomeLoss,
    CommonStockSharesOutstanding,
}

impl CanonicalTag {
    pub const ALL: &'static [CanonicalTag] = &[
        CanonicalTag::Assets,
        CanonicalTag::LiabilitiesCurrent,
        CanonicalTag::AssetsCurrent,
        CanonicalTag::RetainedEarnings,
        CanonicalTag::Ebit,
        CanonicalTag::Liabilities,
        CanonicalTag::Revenues,
        CanonicalTag::StockholdersEquity,
        CanonicalTag::NetIncomeLoss,
        CanonicalTag::CommonStockSharesOutstanding,
    ];

    /// The eight tags checked when diagnosing a filing.
    pub const CORE: &'static [CanonicalTag] = &[
        CanonicalTag::Assets,
        CanonicalTag::LiabilitiesCurrent,
        CanonicalTag::AssetsCurrent,
        CanonicalTag::RetainedEarnings,
        CanonicalTag::Ebit,
        CanonicalTag::Liabilities,
        CanonicalTag::Revenues,
        CanonicalTag::StockholdersEquity,
    ];

    /// Tags without which no Z''-Score is attempted.
    pub const REQUIRED_FOR_Z: &'static [CanonicalTag] = &[
        CanonicalTag::Assets,
        CanonicalTag::LiabilitiesCurrent,
        CanonicalTag::AssetsCurrent,
        CanonicalTag::RetainedEarnings,
        CanonicalTag::Ebit,
        CanonicalTag::Liabilities,
        CanonicalTag::StockholdersEquity,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CanonicalTag::Assets => "Assets",
            CanonicalTag::LiabilitiesCurrent => "LiabilitiesCurrent",
            CanonicalTag::AssetsCurrent => "AssetsCurrent",
            CanonicalTag::RetainedEarnings => "RetainedEarnings",
            CanonicalTag::Ebit => "EBIT",
            CanonicalTag::Liabilities => "Liabilities",
            CanonicalTag::Revenues => "Revenues",
            CanonicalTag::StockholdersEquity => "StockholdersEquity",
            CanonicalTag::NetIncomeLoss => "NetIncomeLoss",
            CanonicalTag::CommonStockSharesOutstanding => "CommonStockSharesOutstanding",
        }
    }
}

impl fmt::Display for CanonicalTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// FSDS rows
// ---------------------------------------------------------------------------

/// One row of an FSDS `sub.txt` file.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub adsh: String,
    pub cik: Cik,
    pub name: String,
    pub form: Option<String>,
    /// Balance sheet date as written in the file (`YYYYMMDD`).
    pub period: String,
    pub fy: Option<String>,
    pub fp: String,
}

impl Submission {
    pub fn is_annual(&self) -> bool {
        self.fp.trim().eq_ignore_ascii_case("FY")
    }

    pub fn period_date(&self) -> Option<NaiveDate> {
        parse_period(&self.period)
    }

    pub fn fiscal_year(&self) -> Option<i32> {
        self.fy.as_deref().and_then(parse_fiscal_year)
    }
}

/// One row of an FSDS `num.txt` file.
#[derive(Debug, Clone, PartialEq)]
pub struct NumFact {
    pub adsh: String,
    pub tag: String,
    pub ddate: Option<String>,
    pub qtrs: Option<String>,
    pub uom: Option<String>,
    pub value: Option<Decimal>,
    /// True when the fact is qualified by a segment, co-registrant or
    /// other dimension and therefore is not the consolidated figure.
    pub dimensional: bool,
}

/// Parse an FSDS period. Accepts `20231231` and float-formatted
/// `20231231.0`.
pub fn parse_period(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let digits = match trimmed.split_once('.') {
        Some((int, frac)) if frac.chars().all(|c| c == '0') => int,
        Some(_) => return None,
        None => trimmed,
    };
    if digits.len() != 8 {
        return None;
    }
    NaiveDate::parse_from_str(digits, "%Y%m%d").ok()
}

/// Parse a fiscal year, tolerating `2023.0`.
pub fn parse_fiscal_year(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(year) = trimmed.parse::<i32>() {
        return Some(year);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite() && f.fract() == 0.0)
        .map(|f| f as i32)
}

/// Parse a numeric FSDS value, including scientific notation.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

// ---------------------------------------------------------------------------
// Filing record & results
// ---------------------------------------------------------------------------

/// A single annual filing with its canonical line items pivoted into
/// one wide record.
#[derive(Debug, Clone, PartialEq)]
pub struct FilingRecord {
    pub adsh: String,
    pub cik: Cik,
    pub name: String,
    pub ticker: String,
    pub period: NaiveDate,
    pub fiscal_period: String,
    pub fiscal_year: i32,
    pub data_source: String,
    pub values: BTreeMap<CanonicalTag, Decimal>,
}

impl FilingRecord {
    pub fn value(&self, tag: CanonicalTag) -> Option<Decimal> {
        self.values.get(&tag).copied()
    }

    pub fn has_all(&self, tags: &[CanonicalTag]) -> bool {
        tags.iter().all(|t| self.values.contains_key(t))
    }
}

/// Z''-Score distress zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Prediction {
    Safe,
    Grey,
    Distress,
    #[serde(rename = "Incomplete/Invalid")]
    Incomplete,
}

impl Prediction {
    pub const ALL: &'static [Prediction] = &[
        Prediction::Safe,
        Prediction::Grey,
        Prediction::Distress,
        Prediction::Incomplete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Prediction::Safe => "Safe",
            Prediction::Grey => "Grey",
            Prediction::Distress => "Distress",
            Prediction::Incomplete => "Incomplete/Invalid",
        }
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Prediction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "safe" => Ok(Prediction::Safe),
            "grey" | "gray" => Ok(Prediction::Grey),
            "distress" => Ok(Prediction::Distress),
            "incomplete/invalid" | "incomplete" | "invalid" => Ok(Prediction::Incomplete),
            _ => Err(anyhow::anyhow!("Unknown prediction: {s}")),
        }
    }
}

/// One computed analysis row, as persisted in `financial_analysis_results`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub adsh: String,
    pub cik: Cik,
    pub name: String,
    pub ticker: String,
    pub period: NaiveDate,
    pub fiscal_period: String,
    pub fiscal_year: i32,
    /// Working capital / total assets.
    pub x1_wcta: Option<Decimal>,
    /// Retained earnings / total assets.
    pub x2_reta: Option<Decimal>,
    /// EBIT / total assets.
    pub x3_ebitta: Option<Decimal>,
    /// Book equity / total liabilities.
    pub x4_mvtl: Option<Decimal>,
    /// Revenues / total assets. Not part of Z''.
    pub x5_salesta: Option<Decimal>,
    pub net_income: Option<Decimal>,
    pub total_equity: Option<Decimal>,
    pub shares_outstanding: Option<Decimal>,
    pub z_score: Decimal,
    pub prediction: Prediction,
    pub eps: Option<Decimal>,
    pub roe: Option<Decimal>,
    pub data_source: String,
}

impl fmt::Display for AnalysisResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}) FY{} period={} Z''={} {}",
            self.cik,
            self.name,
            self.ticker,
            self.fiscal_year,
            self.period,
            self.z_score,
            self.prediction,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid CIK: {0:?}")]
    InvalidCik(String),

    #[error("Invalid quarter directory name: {0:?}")]
    InvalidQuarter(String),

    #[error("Missing required column {column:?} in {file}")]
    MissingColumn { file: String, column: String },

    #[error("Constituent table not found: {0}")]
    TableNotFound(String),

    #[error("Unsupported index: {0}")]
    UnsupportedIndex(String),

    #[error("SEC request failed ({url}): {message}")]
    Sec { url: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
