//! Discovery of quarterly FSDS directories.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::types::Quarter;

/// A quarter directory on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarterDir {
    pub quarter: Quarter,
    pub path: PathBuf,
}

impl QuarterDir {
    /// Directory name, used as the `data_source` of loaded rows.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.quarter.to_string())
    }
}

/// List all `YYYYqN` subdirectories of `dir`, oldest first.
/// A missing `dir` yields an empty list.
pub fn discover_quarters(dir: &Path) -> Result<Vec<QuarterDir>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        if let Ok(quarter) = name.to_string_lossy().parse::<Quarter>() {
            found.push(QuarterDir {
                quarter,
                path: entry.path(),
            });
        }
    }
    found.sort_by_key(|q| q.quarter);
    Ok(found)
}

/// Annual reports for fiscal year `y` are mostly filed in `{y}q4` and
/// `{y+1}q1`. Returns whichever of those exist; if neither does, falls
/// back to every quarter directory.
pub fn select_for_year(dir: &Path, year: i32) -> Result<Vec<QuarterDir>> {
    let all = discover_quarters(dir)?;
    let wanted = [(year, 4u8), (year + 1, 1u8)];
    let selected: Vec<QuarterDir> = all
        .iter()
        .filter(|q| wanted.contains(&(q.quarter.year, q.quarter.quarter)))
        .cloned()
        .collect();

    if selected.is_empty() {
        error!(year, "No quarter directories for target year, attempting full scan");
        return Ok(all);
    }

    info!(
        year,
        dirs = ?selected.iter().map(QuarterDir::name).collect::<Vec<_>>(),
        "Filtering directories for target year"
    );
    Ok(selected)
}
