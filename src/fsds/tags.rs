//! Raw XBRL tag → canonical line item normalisation.
//!
//! Filers report the same balance-sheet concept under different tags.
//! Each canonical item lists its accepted aliases in priority order:
//! when a filing reports several aliases, the earliest one wins.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::types::CanonicalTag;

/// Accepted raw tags for a canonical item, in priority order.
pub fn aliases(tag: CanonicalTag) -> &'static [&'static str] {
    match tag {
        CanonicalTag::Assets => &[
            "Assets",
            "AssetsTotal",
            "AssetsNet",
            "TotalAssets",
            "AssetsCombined",
        ],
        CanonicalTag::LiabilitiesCurrent => &[
            "LiabilitiesCurrent",
            "CurrentLiabilities",
            "LiabilitiesCurrentTotal",
            "TotalCurrentLiabilities",
            "LiabilitiesCurrentAbstract",
            "TotalLiabilitiesCurrent",
        ],
        CanonicalTag::AssetsCurrent => &[
            "AssetsCurrent",
            "CurrentAssets",
            "AssetsCurrentTotal",
            "TotalCurrentAssets",
            "AssetsCurrentAbstract",
            "TotalAssetsCurrent",
        ],
        CanonicalTag::RetainedEarnings => &[
            "RetainedEarnings",
            "AccumulatedDeficit",
            "RetainedEarningsAccumulatedDeficit",
            "RetainedEarningsAccumulatedDeficitAbstract",
        ],
        CanonicalTag::Ebit => &[
            "OperatingIncomeLoss",
            "EarningsBeforeInterestAndTaxes",
            "IncomeLossFromContinuingOperationsBeforeInterestExpenseAndTaxExpense",
            "IncomeLossFromContinuingOperationsBeforeIncomeTaxesMinorityInterestAndIncomeLossFromEquityInvestments",
            "PretaxIncomeLossFromContinuingOperations",
        ],
        CanonicalTag::Liabilities => &[
            "Liabilities",
            "LiabilitiesTotal",
            "TotalLiabilitiesNoncurrentAndCurrent",
            "TotalLiabilities",
        ],
        CanonicalTag::Revenues => &[
            "Revenues",
            "SalesRevenueNet",
            "RevenuesTotal",
            "TotalRevenue",
            "NetSales",
            "RevenueFromContractWithCustomerExcludingAssessedTax",
            "RevenueFromContractWithCustomerIncludingAssessedTax",
        ],
        CanonicalTag::StockholdersEquity => &[
            "StockholdersEquity",
            "CommonStockholdersEquity",
            "PartnersCapital",
            "TotalStockholdersEquity",
            "StockholdersEquityIncludingPortionAttributableToNoncontrollingInterest",
            "EquityAttributableToParent",
        ],
        CanonicalTag::NetIncomeLoss => &[
            "NetIncomeLoss",
            "IncomeLossFromContinuingOperations",
            "ProfitLoss",
            "NetIncomeLossAttributableToParent",
        ],
        CanonicalTag::CommonStockSharesOutstanding => &[
            "CommonStockSharesOutstanding",
            "CommonStockSharesIssued",
            "WeightedAverageNumberOfShareOutstandingBasic",
        ],
    }
}

fn rename_map() -> &'static HashMap<&'static str, (CanonicalTag, usize)> {
    static MAP: OnceLock<HashMap<&'static str, (CanonicalTag, usize)>> = OnceLock::new();
    MAP.get_or_init(|| {
        let mut map = HashMap::new();
        for tag in CanonicalTag::ALL {
            for (rank, alias) in aliases(*tag).iter().enumerate() {
                map.entry(*alias).or_insert((*tag, rank));
            }
        }
        map
    })
}

/// Map a raw tag to its canonical item and alias rank (0 = preferred).
pub fn canonicalize(raw: &str) -> Option<(CanonicalTag, usize)> {
    rename_map().get(raw).copied()
}

pub fn is_known_alias(raw: &str) -> bool {
    rename_map().contains_key(raw)
}

/// Total number of raw aliases across all canonical items.
pub fn alias_count() -> usize {
    rename_map().len()
}
