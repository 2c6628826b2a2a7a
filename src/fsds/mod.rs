//! SEC Financial Statement Data Sets (FSDS).
//!
//! Each quarterly release is a directory (`2023q4/`) holding tab-separated
//! `sub.txt` (one row per filing), `num.txt` (one row per numeric fact)
//! and `tag.txt` (the tag dictionary). This module reads those files,
//! normalises raw XBRL tags to canonical line items and pivots facts into
//! one wide `FilingRecord` per annual filing.

pub mod loader;
pub mod quarters;
pub mod reader;
pub mod tags;

pub const SUB_FILE_NAME: &str = "sub.txt";
pub const NUM_FILE_NAME: &str = "num.txt";
pub const TAG_FILE_NAME: &str = "tag.txt";
