//! 8-K bankruptcy labelling.
//!
//! Walks a crawled 8-K index, downloads each filing and records those
//! that report Item 1.03 (Bankruptcy or Receivership). The output CSV is
//! also the checkpoint: a restarted run skips every input row up to and
//! including the last path written, then carries on.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{info, warn};

use crate::sec::master_index::{read_index_csv, IndexEntry, INDEX_FIELDS};
use crate::sec::FilingSource;

const ARCHIVE_PREFIX: &str = "edgar/data/";
const BANKRUPTCY_ITEM: &str = "item 1.03";
const LABEL_FIELD: &str = "Label";
const PROGRESS_EVERY: usize = 100;

/// Index of `File Path` within an output row.
const PATH_FIELD: usize = 3;

pub fn is_bankruptcy_event(text: &str) -> bool {
    text.to_lowercase().contains(BANKRUPTCY_ITEM)
}

/// The archive path of the last row written to `output`, if any.
pub fn last_processed_path(output: &Path) -> Option<String> {
    let text = std::fs::read_to_string(output).ok()?;
    let last = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with(INDEX_FIELDS[0]))
        .last()?;
    let path = last.split(',').nth(PATH_FIELD)?.trim();
    path.starts_with(ARCHIVE_PREFIX).then(|| path.to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelReport {
    /// Rows walked this session, including those skipped to reach the
    /// checkpoint.
    pub processed: usize,
    /// Filings labelled as bankruptcy events this session.
    pub found: usize,
    pub checkpoint: Option<String>,
    pub checkpoint_reached: bool,
}

pub struct BankruptcyLabeler<'a> {
    source: &'a dyn FilingSource,
}

impl<'a> BankruptcyLabeler<'a> {
    pub fn new(source: &'a dyn FilingSource) -> Self {
        Self { source }
    }

    pub async fn run(&self, input: &Path, output: &Path) -> Result<LabelReport> {
        if !input.exists() {
            anyhow::bail!("Input file not found: {}", input.display());
        }
        let entries = read_index_csv(input)?;

        let checkpoint = last_processed_path(output);
        match &checkpoint {
            Some(path) => info!(checkpoint = %path, "Resuming after checkpoint"),
            None => info!("No checkpoint found, starting from the beginning"),
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(output)
            .with_context(|| format!("Failed to open {}", output.display()))?;
        let is_new = file.metadata()?.len() == 0;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if is_new {
            writer.write_record(INDEX_FIELDS.iter().copied().chain([LABEL_FIELD]))?;
            writer.flush()?;
        }

        let mut report = LabelReport {
            checkpoint: checkpoint.clone(),
            ..Default::default()
        };
        let mut resuming = checkpoint.is_some();

        info!(input = %input.display(), rows = entries.len(), "Starting 8-K analysis");
        for entry in &entries {
            let path = entry.file_path.trim();
            if entry.cik.trim() == INDEX_FIELDS[0] || !path.starts_with(ARCHIVE_PREFIX) {
                continue;
            }

            report.processed += 1;
            if resuming {
                if checkpoint.as_deref() == Some(path) {
                    resuming = false;
                    report.checkpoint_reached = true;
                    info!(checkpoint = %path, "Checkpoint reached");
                }
                continue;
            }

            if report.processed % PROGRESS_EVERY == 0 {
                info!(processed = report.processed, cik = %entry.cik.trim(), "Labelling progress");
            }

            let Some(text) = self.source.fetch_filing(path).await? else {
                continue;
            };
            if is_bankruptcy_event(&text) {
                info!(cik = %entry.cik.trim(), date = %entry.filing_date.trim(), "Bankruptcy filing found");
                write_label(&mut writer, entry)?;
                report.found += 1;
            }
        }

        if checkpoint.is_some() && !report.checkpoint_reached {
            warn!("Checkpoint path never appeared in the input; nothing was labelled");
        }
        info!(
            processed = report.processed,
            found = report.found,
            output = %output.display(),
            "8-K analysis complete"
        );
        Ok(report)
    }
}

/// Append one labelled row and force it to disk.
fn write_label(writer: &mut csv::Writer<std::fs::File>, entry: &IndexEntry) -> Result<()> {
    writer.write_record([
        entry.cik.trim(),
        entry.form_type.trim(),
        entry.filing_date.trim(),
        entry.file_path.trim(),
        "1",
    ])?;
    writer.flush()?;
    writer.get_ref().sync_all().context("Failed to sync label file")?;
    Ok(())
}
