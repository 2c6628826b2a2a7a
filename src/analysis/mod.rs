//! Financial analysis.
//!
//! - `zscore`: Altman Z''-Score ratios, valuation ratios, distress zones
//! - `diagnose`: missing-tag diagnosis for a filer's latest annual report
//! - `verifier`: annual report filing coverage for an index universe

pub mod diagnose;
pub mod verifier;
pub mod zscore;
