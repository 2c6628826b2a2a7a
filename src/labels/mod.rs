//! Event labels derived from raw filings.

pub mod bankruptcy;

pub use bankruptcy::{is_bankruptcy_event, last_processed_path, BankruptcyLabeler, LabelReport};
