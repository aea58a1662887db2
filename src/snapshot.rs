use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::record::{JobRecord, RunStamp};

pub const LATEST_FILE: &str = "latest.json";
pub const ARCHIVE_DIR: &str = "archive";

/// Where one run's snapshots landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPaths {
    pub archive: PathBuf,
    pub latest: PathBuf,
}

/// Pretty-print `records` to `path`, creating parents and overwriting.
pub fn dump_to_json(records: &[JobRecord], path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json)?;
    Ok(())
}

/// `dir/archive/<stamp>.json` (one per run) and `dir/latest.json`.
pub fn write_snapshots(records: &[JobRecord], dir: &Path, stamp: &RunStamp) -> Result<SnapshotPaths> {
    let paths = SnapshotPaths {
        archive: dir.join(ARCHIVE_DIR).join(format!("{}.json", stamp.archive_stem())),
        latest: dir.join(LATEST_FILE),
    };
    dump_to_json(records, &paths.archive)?;
    dump_to_json(records, &paths.latest)?;
    Ok(paths)
}
