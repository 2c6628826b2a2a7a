//! Altman Z''-Score (emerging-market / non-manufacturer variant).
//!
//! Z'' = 6.56·X1 + 3.26·X2 + 6.72·X3 + 1.05·X4
//! where:
//!   X1 = (current assets − current liabilities) / total assets
//!   X2 = retained earnings / total assets
//!   X3 = EBIT / total assets
//!   X4 = book equity / total liabilities
//!
//! X5 (revenues / total assets) belongs to the original manufacturer
//! model; it is reported but not scored.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::warn;

use crate::types::{AnalysisResult, CanonicalTag, FilingRecord, Prediction};

const W1: Decimal = dec!(6.56);
const W2: Decimal = dec!(3.26);
const W3: Decimal = dec!(6.72);
const W4: Decimal = dec!(1.05);

const RATIO_DP: u32 = 4;
const Z_DP: u32 = 3;
const EPS_DP: u32 = 2;

// ---------------------------------------------------------------------------
// Zones
// ---------------------------------------------------------------------------

/// Z'' zone cut-offs. Scores strictly above `safe_above` are Safe,
/// strictly above `grey_above` are Grey, the rest Distress.
#[derive(Debug, Clone)]
pub struct ZoneThresholds {
    pub safe_above: Decimal,
    pub grey_above: Decimal,
}

impl Default for ZoneThresholds {
    fn default() -> Self {
        Self {
            safe_above: dec!(2.6),
            grey_above: dec!(1.1),
        }
    }
}

/// Classify a (rounded) Z''-Score with the default cut-offs.
pub fn classify(z: Option<Decimal>) -> Prediction {
    classify_with(z, &ZoneThresholds::default())
}

pub fn classify_with(z: Option<Decimal>, zones: &ZoneThresholds) -> Prediction {
    match z {
        None => Prediction::Incomplete,
        Some(z) if z > zones.safe_above => Prediction::Safe,
        Some(z) if z > zones.grey_above => Prediction::Grey,
        Some(_) => Prediction::Distress,
    }
}

// ---------------------------------------------------------------------------
// Ratios
// ---------------------------------------------------------------------------

/// Unrounded Z'' inputs for one filing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ratios {
    pub x1: Option<Decimal>,
    pub x2: Option<Decimal>,
    pub x3: Option<Decimal>,
    pub x4: Option<Decimal>,
    pub x5: Option<Decimal>,
}

impl Ratios {
    /// Weighted Z'' sum; `None` if any of X1–X4 is missing.
    pub fn z_double_prime(&self) -> Option<Decimal> {
        weighted_sum(self.x1?, self.x2?, self.x3?, self.x4?)
    }
}

/// 6.56·X1 + 3.26·X2 + 6.72·X3 + 1.05·X4, or `None` if it overflows
/// `Decimal` (ratios blow up when the denominator is nearly zero).
pub fn weighted_sum(x1: Decimal, x2: Decimal, x3: Decimal, x4: Decimal) -> Option<Decimal> {
    [(W1, x1), (W2, x2), (W3, x3), (W4, x4)]
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, (w, x)| acc.checked_add(w.checked_mul(x)?))
}

/// Division that treats a zero denominator as missing data.
fn ratio(num: Option<Decimal>, den: Option<Decimal>) -> Option<Decimal> {
    num?.checked_div(den?)
}

/// Compute X1–X5 from a filing's line items.
pub fn ratios(record: &FilingRecord) -> Ratios {
    let v = |t| record.value(t);
    let assets = v(CanonicalTag::Assets);
    let working_capital = match (v(CanonicalTag::AssetsCurrent), v(CanonicalTag::LiabilitiesCurrent)) {
        (Some(ca), Some(cl)) => ca.checked_sub(cl),
        _ => None,
    };

    Ratios {
        x1: ratio(working_capital, assets),
        x2: ratio(v(CanonicalTag::RetainedEarnings), assets),
        x3: ratio(v(CanonicalTag::Ebit), assets),
        x4: ratio(v(CanonicalTag::StockholdersEquity), v(CanonicalTag::Liabilities)),
        x5: ratio(v(CanonicalTag::Revenues), assets),
    }
}

fn round(value: Option<Decimal>, dp: u32) -> Option<Decimal> {
    value.map(|v| v.round_dp(dp))
}

// ---------------------------------------------------------------------------
// Record → result
// ---------------------------------------------------------------------------

/// Score one filing.
///
/// Returns `None` when any line item required for Z'' is absent; such
/// filings are excluded from the result set. Filings with all items but a
/// zero denominator are kept as `Incomplete/Invalid` with a zero score.
pub fn compute(record: &FilingRecord) -> Option<AnalysisResult> {
    if !record.has_all(CanonicalTag::REQUIRED_FOR_Z) {
        return None;
    }

    let r = ratios(record);
    let z = round(r.z_double_prime(), Z_DP);
    let prediction = classify(z);

    let net_income = record.value(CanonicalTag::NetIncomeLoss);
    let equity = record.value(CanonicalTag::StockholdersEquity);
    let shares = record.value(CanonicalTag::CommonStockSharesOutstanding);

    Some(AnalysisResult {
        adsh: record.adsh.clone(),
        cik: record.cik,
        name: record.name.clone(),
        ticker: record.ticker.clone(),
        period: record.period,
        fiscal_period: record.fiscal_period.clone(),
        fiscal_year: record.fiscal_year,
        x1_wcta: round(r.x1, RATIO_DP),
        x2_reta: round(r.x2, RATIO_DP),
        x3_ebitta: round(r.x3, RATIO_DP),
        x4_mvtl: round(r.x4, RATIO_DP),
        x5_salesta: round(r.x5, RATIO_DP),
        net_income,
        total_equity: equity,
        shares_outstanding: shares,
        z_score: z.unwrap_or(Decimal::ZERO),
        prediction,
        eps: round(ratio(net_income, shares), EPS_DP),
        roe: round(ratio(net_income, equity), RATIO_DP),
        data_source: record.data_source.clone(),
    })
}

/// Score a batch, dropping filings without the required items.
pub fn compute_batch(records: &[FilingRecord]) -> Vec<AnalysisResult> {
    let results: Vec<AnalysisResult> = records.iter().filter_map(compute).collect();
    if results.is_empty() && !records.is_empty() {
        warn!(
            input = records.len(),
            "All records filtered out due to missing required financial items"
        );
    }
    results
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn record(values: &[(CanonicalTag, Decimal)]) -> FilingRecord {
        FilingRecord {
            adsh: "0001-23-000001".into(),
            cik: "1001".parse().unwrap(),
            name: "ALPHA CORP".into(),
            ticker: "ALPH".into(),
            period: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            fiscal_period: "FY".into(),
            fiscal_year: 2023,
            data_source: "2024q1".into(),
            values: values.iter().copied().collect::<BTreeMap<_, _>>(),
        }
    }

    fn healthy() -> Vec<(CanonicalTag, Decimal)> {
        vec![
            (CanonicalTag::Assets, dec!(1000)),
            (CanonicalTag::AssetsCurrent, dec!(500)),
            (CanonicalTag::LiabilitiesCurrent, dec!(200)),
            (CanonicalTag::RetainedEarnings, dec!(300)),
            (CanonicalTag::Ebit, dec!(100)),
            (CanonicalTag::Liabilities, dec!(400)),
            (CanonicalTag::StockholdersEquity, dec!(600)),
        ]
    }

    fn with(mut base: Vec<(CanonicalTag, Decimal)>, tag: CanonicalTag, value: Decimal) -> Vec<(CanonicalTag, Decimal)> {
        base.retain(|(t, _)| *t != tag);
        base.push((tag, value));
        base
    }

    #[test]
    fn test_safe_company() {
        let result = compute(&record(&healthy())).unwrap();
        assert_eq!(result.x1_wcta, Some(dec!(0.3)));
        assert_eq!(result.x2_reta, Some(dec!(0.3)));
        assert_eq!(result.x3_ebitta, Some(dec!(0.1)));
        assert_eq!(result.x4_mvtl, Some(dec!(1.5)));
        assert_eq!(result.z_score, dec!(5.193));
        assert_eq!(result.prediction, Prediction::Safe);
        assert_eq!(result.x5_salesta, None);
    }

    #[test]
    fn test_grey_company() {
        let values = vec![
            (CanonicalTag::Assets, dec!(1000)),
            (CanonicalTag::AssetsCurrent, dec!(300)),
            (CanonicalTag::LiabilitiesCurrent, dec!(200)),
            (CanonicalTag::RetainedEarnings, dec!(100)),
            (CanonicalTag::Ebit, dec!(50)),
            (CanonicalTag::Liabilities, dec!(500)),
            (CanonicalTag::StockholdersEquity, dec!(500)),
        ];
        let result = compute(&record(&values)).unwrap();
        assert_eq!(result.z_score, dec!(2.368));
        assert_eq!(result.prediction, Prediction::Grey);
    }

    #[test]
    fn test_distress_company() {
        let values = vec![
            (CanonicalTag::Assets, dec!(1000)),
            (CanonicalTag::AssetsCurrent, dec!(200)),
            (CanonicalTag::LiabilitiesCurrent, dec!(400)),
            (CanonicalTag::RetainedEarnings, dec!(-100)),
            (CanonicalTag::Ebit, dec!(10)),
            (CanonicalTag::Liabilities, dec!(900)),
            (CanonicalTag::StockholdersEquity, dec!(100)),
        ];
        let result = compute(&record(&values)).unwrap();
        assert_eq!(result.x4_mvtl, Some(dec!(0.1111)));
        // Scored from unrounded ratios: -1.312 - 0.326 + 0.0672 + 0.11666..
        assert_eq!(result.z_score, dec!(-1.454));
        assert_eq!(result.prediction, Prediction::Distress);
    }

    #[test]
    fn test_missing_required_item_excluded() {
        let mut values = healthy();
        values.retain(|(t, _)| *t != CanonicalTag::RetainedEarnings);
        assert!(compute(&record(&values)).is_none());
    }

    #[test]
    fn test_revenues_not_required() {
        let result = compute(&record(&healthy())).unwrap();
        assert_eq!(result.prediction, Prediction::Safe);

        let values = with(healthy(), CanonicalTag::Revenues, dec!(2500));
        let result = compute(&record(&values)).unwrap();
        assert_eq!(result.x5_salesta, Some(dec!(2.5)));
        assert_eq!(result.z_score, dec!(5.193));
    }

    #[test]
    fn test_zero_liabilities_is_incomplete() {
        let values = with(healthy(), CanonicalTag::Liabilities, Decimal::ZERO);
        let result = compute(&record(&values)).unwrap();
        assert_eq!(result.x4_mvtl, None);
        assert_eq!(result.x1_wcta, Some(dec!(0.3)));
        assert_eq!(result.z_score, Decimal::ZERO);
        assert_eq!(result.prediction, Prediction::Incomplete);
    }

    #[test]
    fn test_overflowing_score_is_incomplete() {
        // X1 = 5 / 1e-28 = 5e28 fits in a Decimal, 6.56 * X1 does not.
        let values = vec![
            (CanonicalTag::Assets, dec!(0.0000000000000000000000000001)),
            (CanonicalTag::AssetsCurrent, dec!(5)),
            (CanonicalTag::LiabilitiesCurrent, Decimal::ZERO),
            (CanonicalTag::RetainedEarnings, Decimal::ZERO),
            (CanonicalTag::Ebit, Decimal::ZERO),
            (CanonicalTag::Liabilities, dec!(400)),
            (CanonicalTag::StockholdersEquity, dec!(600)),
        ];
        let result = compute(&record(&values)).unwrap();
        assert_eq!(result.x1_wcta, Some(dec!(50000000000000000000000000000)));
        assert_eq!(result.z_score, Decimal::ZERO);
        assert_eq!(result.prediction, Prediction::Incomplete);
    }

    #[test]
    fn test_weighted_sum() {
        assert_eq!(weighted_sum(dec!(0.3), dec!(0.3), dec!(0.1), dec!(1.5)), Some(dec!(5.193)));
        assert_eq!(weighted_sum(Decimal::MAX, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO), None);
        assert_eq!(weighted_sum(dec!(1), dec!(1), dec!(1), Decimal::MAX), None);
    }

    #[test]
    fn test_zero_assets_is_incomplete() {
        let values = with(healthy(), CanonicalTag::Assets, Decimal::ZERO);
        let result = compute(&record(&values)).unwrap();
        assert_eq!(result.x1_wcta, None);
        assert_eq!(result.x2_reta, None);
        assert_eq!(result.x3_ebitta, None);
        assert_eq!(result.prediction, Prediction::Incomplete);
    }

    #[test]
    fn test_valuation_ratios() {
        let values = with(
            with(healthy(), CanonicalTag::NetIncomeLoss, dec!(250)),
            CanonicalTag::CommonStockSharesOutstanding,
            dec!(100),
        );
        let result = compute(&record(&values)).unwrap();
        assert_eq!(result.roe, Some(dec!(0.4167)));
        assert_eq!(result.eps, Some(dec!(2.50)));
        assert_eq!(result.net_income, Some(dec!(250)));
        assert_eq!(result.total_equity, Some(dec!(600)));
    }

    #[test]
    fn test_valuation_ratios_missing_inputs() {
        let values = with(healthy(), CanonicalTag::CommonStockSharesOutstanding, Decimal::ZERO);
        let result = compute(&record(&values)).unwrap();
        assert_eq!(result.eps, None);
        assert_eq!(result.roe, None);
    }

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify(Some(dec!(2.601))), Prediction::Safe);
        assert_eq!(classify(Some(dec!(2.6))), Prediction::Grey);
        assert_eq!(classify(Some(dec!(1.101))), Prediction::Grey);
        assert_eq!(classify(Some(dec!(1.1))), Prediction::Distress);
        assert_eq!(classify(Some(dec!(-3))), Prediction::Distress);
        assert_eq!(classify(None), Prediction::Incomplete);
    }

    #[test]
    fn test_custom_thresholds() {
        let zones = ZoneThresholds {
            safe_above: dec!(3.0),
            grey_above: dec!(1.5),
        };
        assert_eq!(classify_with(Some(dec!(2.8)), &zones), Prediction::Grey);
    }

    #[test]
    fn test_rounding_is_half_even() {
        assert_eq!(round(Some(dec!(0.00005)), RATIO_DP), Some(dec!(0.0000)));
        assert_eq!(round(Some(dec!(0.00015)), RATIO_DP), Some(dec!(0.0002)));
        assert_eq!(round(Some(dec!(1.0125)), 3), Some(dec!(1.012)));
    }

    #[test]
    fn test_compute_batch_filters() {
        let mut incomplete = healthy();
        incomplete.retain(|(t, _)| *t != CanonicalTag::Ebit);
        let records = vec![record(&healthy()), record(&incomplete)];
        assert_eq!(compute_batch(&records).len(), 1);
        assert!(compute_batch(&[record(&incomplete)]).is_empty());
        assert!(compute_batch(&[]).is_empty());
    }
}
