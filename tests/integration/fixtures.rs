//! On-disk fixtures: a small FSDS tree, a mapping CSV and master index
//! text.

use std::path::Path;

use altman::fsds::{NUM_FILE_NAME, SUB_FILE_NAME, TAG_FILE_NAME};
use altman::storage;
use sqlx::sqlite::SqlitePool;

const SUB_HEADER: &str = "adsh\tcik\tname\tform\tperiod\tfy\tfp\n";
const NUM_HEADER: &str = "adsh\ttag\tversion\tddate\tqtrs\tuom\tsegments\tcoreg\tvalue\tfootnote\n";

/// Balance sheet and income items for one filing, as `(tag, value)`.
pub type Items<'a> = &'a [(&'a str, &'a str)];

/// Healthy filer: Z'' = 5.193.
pub const SAFE: Items<'static> = &[
    ("Assets", "1000"),
    ("AssetsCurrent", "500"),
    ("LiabilitiesCurrent", "200"),
    ("RetainedEarningsAccumulatedDeficit", "300"),
    ("OperatingIncomeLoss", "100"),
    ("Liabilities", "400"),
    ("StockholdersEquity", "600"),
    ("NetIncomeLoss", "50"),
    ("Revenues", "900"),
];

/// Loss-making filer with negative working capital: Z'' = -1.454.
pub const DISTRESS: Items<'static> = &[
    ("Assets", "1000"),
    ("AssetsCurrent", "200"),
    ("LiabilitiesCurrent", "400"),
    ("RetainedEarningsAccumulatedDeficit", "-200"),
    ("OperatingIncomeLoss", "-50"),
    ("Liabilities", "900"),
    ("StockholdersEquity", "100"),
];

/// Files retained earnings under a tag outside the alias map and
/// reports no EBIT or revenue.
pub const PARTIAL: Items<'static> = &[
    ("Assets", "1000"),
    ("AssetsCurrent", "500"),
    ("LiabilitiesCurrent", "200"),
    ("Liabilities", "400"),
    ("StockholdersEquity", "600"),
    ("RetainedEarningsAppropriated", "300"),
];

pub struct Filing<'a> {
    pub adsh: &'a str,
    pub cik: &'a str,
    pub name: &'a str,
    pub form: &'a str,
    pub period: &'a str,
    pub fy: &'a str,
    pub fp: &'a str,
    pub items: Items<'a>,
}

/// Write `sub.txt` and `num.txt` for one quarter directory under `root`.
pub fn write_quarter(root: &Path, quarter: &str, filings: &[Filing]) {
    let dir = root.join(quarter);
    std::fs::create_dir_all(&dir).unwrap();

    let mut sub = SUB_HEADER.to_string();
    let mut num = NUM_HEADER.to_string();
    for f in filings {
        sub.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
            f.adsh, f.cik, f.name, f.form, f.period, f.fy, f.fp
        ));
        for (tag, value) in f.items {
            num.push_str(&format!(
                "{}\t{tag}\tus-gaap/2023\t{}\t0\tUSD\t\t\t{value}\t\n",
                f.adsh, f.period
            ));
        }
    }
    std::fs::write(dir.join(SUB_FILE_NAME), sub).unwrap();
    std::fs::write(dir.join(NUM_FILE_NAME), num).unwrap();
}

pub fn write_tags(root: &Path, quarter: &str, tags: &[&str]) {
    let dir = root.join(quarter);
    std::fs::create_dir_all(&dir).unwrap();
    let mut text = "tag\tversion\tcustom\tabstract\tdatatype\tiord\tcrdr\ttlabel\tdoc\n".to_string();
    for tag in tags {
        text.push_str(&format!("{tag}\tus-gaap/2023\t0\t0\tmonetary\tI\tD\t{tag}\t\n"));
    }
    std::fs::write(dir.join(TAG_FILE_NAME), text).unwrap();
}

/// Three filers across two fiscal years, split over two quarters.
pub fn sample_data_dir() -> tempfile::TempDir {
    let root = tempfile::tempdir().unwrap();
    write_quarter(
        root.path(),
        "2024q1",
        &[
            Filing {
                adsh: "0000001001-24-000001",
                cik: "1001",
                name: "ALPHA CORP",
                form: "10-K",
                period: "20231231",
                fy: "2023",
                fp: "FY",
                items: SAFE,
            },
            Filing {
                adsh: "0000001002-24-000001",
                cik: "1002",
                name: "BETA HOLDINGS",
                form: "10-K",
                period: "20231231",
                fy: "2023",
                fp: "FY",
                items: DISTRESS,
            },
            Filing {
                adsh: "0000001002-24-000002",
                cik: "1002",
                name: "BETA HOLDINGS",
                form: "10-Q",
                period: "20240331",
                fy: "2024",
                fp: "Q1",
                items: SAFE,
            },
        ],
    );
    write_quarter(
        root.path(),
        "2023q1",
        &[Filing {
            adsh: "0000001001-23-000001",
            cik: "1001",
            name: "ALPHA CORP",
            form: "10-K",
            period: "20221231",
            fy: "2022",
            fp: "FY",
            items: DISTRESS,
        }],
    );
    root
}

pub const TICKERS: &str = "alph\t1001\nbeta\t1002\ngamm\t1003\n";

/// In-memory database with the schema applied. One connection so every
/// query sees the same database.
pub async fn memory_db() -> SqlitePool {
    storage::open("sqlite::memory:", 1).await.unwrap()
}

pub const MASTER_INDEX: &str = "\
Description:           Master Index of EDGAR Dissemination Feed
Last Data Received:    March 31, 2025

CIK|Company Name|Form Type|Date Filed|Filename
--------------------------------------------------------------------------------
1001|ALPHA CORP|8-K|2025-01-10|edgar/data/1001/0000001001-25-000004.txt
1001|ALPHA CORP|10-Q|2025-02-10|edgar/data/1001/0000001001-25-000005.txt
1002|BETA HOLDINGS|8-K|2025-02-14|edgar/data/1002/0000001002-25-000007.txt
1003|GAMMA INC|8-K/A|2025-03-01|edgar/data/1003/0000001003-25-000002.txt
1003|GAMMA INC|8-K|2025-03-02|edgar/data/1003/0000001003-25-000003.txt
";
