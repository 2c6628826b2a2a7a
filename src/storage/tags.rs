//! `raw_tags`: the FSDS tag dictionary merged across quarters.

use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::fsds::reader::{read_tags, RawTag};
use crate::fsds::TAG_FILE_NAME;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagIngestReport {
    pub folders: usize,
    pub rows: usize,
    pub failed: Vec<String>,
}

async fn insert_tags(pool: &SqlitePool, tags: &[RawTag], replace: bool) -> Result<()> {
    let mut tx = pool.begin().await?;
    if replace {
        sqlx::query("DELETE FROM raw_tags").execute(&mut *tx).await?;
    }
    for t in tags {
        sqlx::query(
            "INSERT INTO raw_tags (tag, version, custom, abstract, datatype, iord, crdr, tlabel, doc) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&t.tag)
        .bind(&t.version)
        .bind(&t.custom)
        .bind(&t.abstract_flag)
        .bind(&t.datatype)
        .bind(&t.iord)
        .bind(&t.crdr)
        .bind(&t.tlabel)
        .bind(&t.doc)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Subfolders of `raw_dir` holding a `tag.txt`, sorted by folder name.
fn tag_folders(raw_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !raw_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut folders = Vec::new();
    for entry in std::fs::read_dir(raw_dir).with_context(|| format!("Failed to list {}", raw_dir.display()))? {
        let entry = entry?;
        let path = entry.path().join(TAG_FILE_NAME);
        if entry.file_type()?.is_dir() && path.is_file() {
            folders.push((entry.file_name().to_string_lossy().into_owned(), path));
        }
    }
    folders.sort();
    Ok(folders)
}

/// Load every `{raw_dir}/*/tag.txt` in folder name order. The first file
/// loaded replaces the table; later files append. A folder that fails is
/// logged and skipped.
pub async fn ingest_raw_tags(pool: &SqlitePool, raw_dir: &Path) -> Result<TagIngestReport> {
    info!(dir = %raw_dir.display(), "Ingesting tag dictionaries");
    let mut report = TagIngestReport::default();

    for (name, path) in tag_folders(raw_dir)? {
        info!(folder = %name, "Processing tag file");

        let loaded = match read_tags(&path) {
            Ok(tags) => insert_tags(pool, &tags, report.folders == 0)
                .await
                .map(|_| tags.len()),
            Err(e) => Err(e),
        };
        match loaded {
            Ok(rows) => {
                report.folders += 1;
                report.rows += rows;
            }
            Err(e) => {
                error!(folder = %name, error = %e, "Error processing tag file");
                report.failed.push(name);
            }
        }
    }

    info!(folders = report.folders, rows = report.rows, "Tag ingest complete");
    Ok(report)
}

/// Drop repeated tag names, keeping the first row loaded for each.
/// Returns the remaining row count.
pub async fn dedupe_raw_tags(pool: &SqlitePool) -> Result<i64> {
    sqlx::query("DELETE FROM raw_tags WHERE rowid NOT IN (SELECT MIN(rowid) FROM raw_tags GROUP BY tag)")
        .execute(pool)
        .await
        .context("Failed to deduplicate raw tags")?;

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM raw_tags")
        .fetch_one(pool)
        .await
        .context("Failed to count raw tags")?;
    info!(unique_tags = remaining, "Tag deduplication finished");
    Ok(remaining)
}
