//! Constituent tables from Wikipedia index pages.

use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

use super::Constituent;
use crate::types::PipelineError;

/// Index pages carry several small tables (sector weights, changes);
/// the member list is the first ticker table larger than this.
const MIN_CONSTITUENT_ROWS: usize = 90;

const TICKER_HEADERS: &[&str] = &["ticker", "symbol"];
const NAME_HEADERS: &[&str] = &["company", "name", "security"];

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid CSS selector {css:?}: {e:?}"))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn find_column(headers: &[String], names: &[&str]) -> Option<usize> {
    names
        .iter()
        .find_map(|name| headers.iter().position(|h| h == name))
}

/// Parse the constituent list out of an index page.
pub fn parse_constituents(html: &str) -> Result<Vec<Constituent>> {
    let document = Html::parse_document(html);
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("th, td")?;

    for table in document.select(&table_sel) {
        let mut rows = table.select(&row_sel);
        let Some(header_row) = rows.next() else {
            continue;
        };
        let headers: Vec<String> = header_row
            .select(&cell_sel)
            .map(|c| cell_text(c).to_lowercase())
            .collect();
        let Some(ticker_col) = find_column(&headers, TICKER_HEADERS) else {
            continue;
        };

        let body: Vec<Vec<String>> = rows
            .map(|r| r.select(&cell_sel).map(cell_text).collect::<Vec<_>>())
            .filter(|cells| !cells.is_empty())
            .collect();
        if body.len() <= MIN_CONSTITUENT_ROWS {
            continue;
        }

        let name_col = find_column(&headers, NAME_HEADERS).unwrap_or(0);
        let mut seen = HashSet::new();
        let constituents = body
            .iter()
            .filter_map(|cells| {
                let ticker = cells.get(ticker_col)?.trim().to_string();
                if ticker.is_empty() || !seen.insert(ticker.clone()) {
                    return None;
                }
                let company_name = cells
                    .get(name_col)
                    .map(|n| n.trim_matches(|c| c == '"' || c == '\'').trim().to_string())
                    .unwrap_or_default();
                Some(Constituent { company_name, ticker })
            })
            .collect();
        return Ok(constituents);
    }

    Err(PipelineError::TableNotFound("no ticker/symbol table with enough rows".into()).into())
}
