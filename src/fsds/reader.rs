//! Tab-separated FSDS file readers.
//!
//! Columns are addressed by header name, not position, so both the older
//! (`coreg`) and newer (`segments`) `num.txt` layouts read the same way.
//! Rows that fail to parse are skipped, matching how the quarterly files
//! are usually consumed: a handful of malformed rows must not sink a
//! multi-million-row load.

use anyhow::{Context, Result};
use csv::{ByteRecord, Reader, ReaderBuilder};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::debug;

use crate::types::{parse_decimal, Cik, NumFact, PipelineError, Submission};

/// Byte decoding applied to each field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// UTF-8, invalid sequences replaced.
    Utf8Lossy,
    /// ISO-8859-1 (the `tag.txt` dictionaries).
    Latin1,
}

impl Encoding {
    fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Encoding::Utf8Lossy => String::from_utf8_lossy(bytes).into_owned(),
            Encoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

/// A header-addressed TSV file.
pub struct TsvFile {
    name: String,
    columns: HashMap<String, usize>,
    reader: Reader<File>,
    encoding: Encoding,
}

impl TsvFile {
    pub fn open(path: &Path, encoding: Encoding) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        let headers = reader
            .byte_headers()
            .with_context(|| format!("Failed to read header of {}", path.display()))?
            .clone();
        let columns = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (encoding.decode(h).trim().to_lowercase(), i))
            .collect();

        Ok(Self {
            name: path.display().to_string(),
            columns,
            reader,
            encoding,
        })
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    pub fn require(&self, name: &str) -> Result<usize, PipelineError> {
        self.column(name).ok_or_else(|| PipelineError::MissingColumn {
            file: self.name.clone(),
            column: name.to_string(),
        })
    }

    /// Visit every well-formed row.
    pub fn for_each_row(&mut self, mut f: impl FnMut(&Row<'_>)) {
        let encoding = self.encoding;
        let mut record = ByteRecord::new();
        let mut line = 0usize;
        loop {
            line += 1;
            match self.reader.read_byte_record(&mut record) {
                Ok(true) => f(&Row {
                    record: &record,
                    encoding,
                }),
                Ok(false) => break,
                Err(e) => {
                    debug!(file = %self.name, line, error = %e, "Skipping malformed row");
                }
            }
        }
    }
}

/// A borrowed row with decoding helpers.
pub struct Row<'a> {
    record: &'a ByteRecord,
    encoding: Encoding,
}

impl Row<'_> {
    /// Raw bytes of a column, `None` when absent from this row.
    pub fn bytes(&self, idx: usize) -> Option<&[u8]> {
        self.record.get(idx)
    }

    /// Trimmed text of a column, `None` when absent or empty.
    pub fn text(&self, idx: usize) -> Option<String> {
        let value = self.encoding.decode(self.record.get(idx)?);
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    fn opt_text(&self, idx: Option<usize>) -> Option<String> {
        idx.and_then(|i| self.text(i))
    }
}

// ---------------------------------------------------------------------------
// sub.txt
// ---------------------------------------------------------------------------

/// Read every submission from a `sub.txt` file.
pub fn read_submissions(path: &Path) -> Result<Vec<Submission>> {
    let mut file = TsvFile::open(path, Encoding::Utf8Lossy)?;
    let adsh = file.require("adsh")?;
    let cik = file.require("cik")?;
    let name = file.require("name")?;
    let period = file.require("period")?;
    let fy = file.require("fy")?;
    let fp = file.require("fp")?;
    let form = file.column("form");

    let mut subs = Vec::new();
    file.for_each_row(|row| {
        let (Some(adsh), Some(cik_raw)) = (row.text(adsh), row.text(cik)) else {
            return;
        };
        let Ok(cik) = cik_raw.parse::<Cik>() else {
            return;
        };
        subs.push(Submission {
            adsh,
            cik,
            name: row.text(name).unwrap_or_default(),
            form: row.opt_text(form),
            period: row.text(period).unwrap_or_default(),
            fy: row.text(fy),
            fp: row.text(fp).unwrap_or_default(),
        });
    });
    Ok(subs)
}

/// Read only `(cik, form)` pairs from a `sub.txt` file.
pub fn read_cik_forms(path: &Path) -> Result<Vec<(Cik, String)>> {
    let mut file = TsvFile::open(path, Encoding::Latin1)?;
    let cik = file.require("cik")?;
    let form = file.require("form")?;

    let mut pairs = Vec::new();
    file.for_each_row(|row| {
        if let (Some(cik), Some(form)) = (row.text(cik), row.text(form)) {
            if let Ok(cik) = cik.parse::<Cik>() {
                pairs.push((cik, form));
            }
        }
    });
    Ok(pairs)
}

// ---------------------------------------------------------------------------
// num.txt
// ---------------------------------------------------------------------------

/// Read facts from a `num.txt` file, keeping only rows for which
/// `keep(adsh, tag)` is true. The filter runs before value parsing.
pub fn read_facts(path: &Path, mut keep: impl FnMut(&str, &str) -> bool) -> Result<Vec<NumFact>> {
    let mut file = TsvFile::open(path, Encoding::Utf8Lossy)?;
    let adsh = file.require("adsh")?;
    let tag = file.require("tag")?;
    let value = file.require("value")?;
    let ddate = file.column("ddate");
    let qtrs = file.column("qtrs");
    let uom = file.column("uom");
    let dimension_cols: Vec<usize> = ["segments", "coreg", "dim"]
        .iter()
        .filter_map(|c| file.column(c))
        .collect();

    let mut facts = Vec::new();
    file.for_each_row(|row| {
        let (Some(adsh), Some(tag)) = (row.text(adsh), row.text(tag)) else {
            return;
        };
        if !keep(&adsh, &tag) {
            return;
        }
        let dimensional = dimension_cols
            .iter()
            .any(|&c| row.bytes(c).is_some_and(|b| !b.trim_ascii().is_empty()));
        facts.push(NumFact {
            adsh,
            tag,
            ddate: row.opt_text(ddate),
            qtrs: row.opt_text(qtrs),
            uom: row.opt_text(uom),
            value: row.text(value).as_deref().and_then(parse_decimal),
            dimensional,
        });
    });
    Ok(facts)
}

// ---------------------------------------------------------------------------
// tag.txt
// ---------------------------------------------------------------------------

/// One row of an FSDS `tag.txt` dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTag {
    pub tag: String,
    pub version: Option<String>,
    pub custom: Option<String>,
    pub abstract_flag: Option<String>,
    pub datatype: Option<String>,
    pub iord: Option<String>,
    pub crdr: Option<String>,
    pub tlabel: Option<String>,
    pub doc: Option<String>,
}

/// Read a Latin-1 encoded `tag.txt` file.
pub fn read_tags(path: &Path) -> Result<Vec<RawTag>> {
    let mut file = TsvFile::open(path, Encoding::Latin1)?;
    let tag = file.require("tag")?;
    let version = file.column("version");
    let custom = file.column("custom");
    let abstract_flag = file.column("abstract");
    let datatype = file.column("datatype");
    let iord = file.column("iord");
    let crdr = file.column("crdr");
    let tlabel = file.column("tlabel");
    let doc = file.column("doc");

    let mut tags = Vec::new();
    file.for_each_row(|row| {
        let Some(name) = row.text(tag) else {
            return;
        };
        tags.push(RawTag {
            tag: name,
            version: row.opt_text(version),
            custom: row.opt_text(custom),
            abstract_flag: row.opt_text(abstract_flag),
            datatype: row.opt_text(datatype),
            iord: row.opt_text(iord),
            crdr: row.opt_text(crdr),
            tlabel: row.opt_text(tlabel),
            doc: row.opt_text(doc),
        });
    });
    Ok(tags)
}
