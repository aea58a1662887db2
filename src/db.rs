use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};

use crate::record::JobRecord;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

/// Open an existing store for reading only; the file and its journal mode
/// are left untouched.
pub fn open_read_only(path: &Path) -> Result<Connection> {
    Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)
        .with_context(|| format!("Failed to open {:?} read-only", path))
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS jobs (
            job_id     TEXT PRIMARY KEY,
            title      TEXT,
            location   TEXT,
            type       TEXT,
            url        TEXT,
            first_seen TIMESTAMP,
            last_seen  TIMESTAMP
        );
        ",
    )?;
    Ok(())
}

// ── Upsert ──

/// Insert new jobs, update known ones. `first_seen` is only ever written on
/// insert; everything else, `last_seen` included, follows the latest record.
pub fn save_jobs(conn: &Connection, records: &[JobRecord]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO jobs (job_id, title, location, type, url, first_seen, last_seen)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(job_id) DO UPDATE SET
                 title     = excluded.title,
                 location  = excluded.location,
                 type      = excluded.type,
                 url       = excluded.url,
                 last_seen = excluded.last_seen",
        )?;
        for r in records {
            count += stmt.execute(rusqlite::params![
                r.job_id, r.title, r.location, r.job_type, r.url, r.scraped_at,
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

// ── Reads ──

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredJob {
    pub job_id: String,
    pub title: String,
    pub location: String,
    pub job_type: String,
    pub url: String,
    pub first_seen: String,
    pub last_seen: String,
}

pub fn fetch_jobs(conn: &Connection) -> Result<Vec<StoredJob>> {
    let mut stmt = conn.prepare(
        "SELECT job_id, COALESCE(title,''), COALESCE(location,''), COALESCE(type,''),
                COALESCE(url,''), COALESCE(first_seen,''), COALESCE(last_seen,'')
         FROM jobs
         ORDER BY job_id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(StoredJob {
                job_id: row.get(0)?,
                title: row.get(1)?,
                location: row.get(2)?,
                job_type: row.get(3)?,
                url: row.get(4)?,
                first_seen: row.get(5)?,
                last_seen: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct StoreStats {
    pub total: usize,
    /// Jobs seen by the most recent run.
    pub active: usize,
    pub latest_seen: Option<String>,
}

pub fn get_stats(conn: &Connection) -> Result<StoreStats> {
    let total: usize = conn.query_row("SELECT COUNT(*) FROM jobs", [], |r| r.get(0))?;
    let latest_seen: Option<String> =
        conn.query_row("SELECT MAX(last_seen) FROM jobs", [], |r| r.get(0))?;
    let active: usize = conn.query_row(
        "SELECT COUNT(*) FROM jobs WHERE last_seen = (SELECT MAX(last_seen) FROM jobs)",
        [],
        |r| r.get(0),
    )?;
    Ok(StoreStats {
        total,
        active,
        latest_seen,
    })
}
