use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::db;
use crate::http::Fetch;
use crate::record::RunStamp;
use crate::snapshot::{self, SnapshotPaths};
use crate::sources::Source;

#[derive(Debug)]
pub struct RunSummary {
    pub source: Source,
    pub records: usize,
    pub db_path: PathBuf,
    pub snapshots: SnapshotPaths,
}

/// `<data_dir>/<source>/`
pub fn source_dir(data_dir: &Path, source: Source) -> PathBuf {
    data_dir.join(source.name())
}

/// `<data_dir>/<source>/<source>_jobs.db`
pub fn db_path(data_dir: &Path, source: Source) -> PathBuf {
    source_dir(data_dir, source).join(format!("{}_jobs.db", source.name()))
}

/// Scrape one source, then persist the batch and write its snapshots.
/// Storage errors abort; nothing is reported as saved unless it was.
pub fn run_source(
    source: Source,
    data_dir: &Path,
    fetcher: &dyn Fetch,
    stamp: &RunStamp,
    params: &[(&str, &str)],
) -> Result<RunSummary> {
    info!("Scraping {} from {}", source, source.listings_url());
    let records = source
        .run(fetcher, stamp, params)
        .with_context(|| format!("{} scrape failed", source))?;

    let db_path = db_path(data_dir, source);
    let conn = db::connect(&db_path)?;
    db::init_schema(&conn)?;
    db::save_jobs(&conn, &records).with_context(|| format!("Failed to save jobs to {:?}", db_path))?;

    let snapshots = snapshot::write_snapshots(&records, &source_dir(data_dir, source), stamp)
        .context("Failed to write JSON snapshots")?;

    info!("✅ Wrote {} records to DB and JSON:", records.len());
    info!("   • SQLite DB: {}", db_path.display());
    info!("   • Archive:   {}", snapshots.archive.display());
    info!("   • Latest:    {}", snapshots.latest.display());

    Ok(RunSummary {
        source,
        records: records.len(),
        db_path,
        snapshots,
    })
}
