//! ALTMAN: SEC filing ingestion and Z''-Score distress pipeline
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod analysis;
pub mod api;
pub mod config;
pub mod engine;
pub mod fsds;
pub mod labels;
pub mod sec;
pub mod storage;
pub mod types;
pub mod universe;
