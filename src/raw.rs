use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::Result;
use crate::http::Fetch;

static UNSAFE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\-.]+").unwrap());

/// Replace each run of characters outside word chars, `-` and `.` with `_`.
pub fn sanitize_filename(s: &str) -> String {
    UNSAFE_RUN.replace_all(s, "_").into_owned()
}

/// Write `content` to `base_dir/<source>/<stamp_dir>/<filename>`.
pub fn save_raw_response(
    content: &[u8],
    base_dir: &Path,
    source: &str,
    stamp_dir: &str,
    filename: &str,
) -> std::io::Result<PathBuf> {
    let run_dir = base_dir.join(source).join(stamp_dir);
    fs::create_dir_all(&run_dir)?;
    let path = run_dir.join(filename);
    fs::write(&path, content)?;
    Ok(path)
}

/// Fetcher decorator that keeps a copy of every body it returns.
pub struct RawRecorder<F> {
    inner: F,
    base_dir: PathBuf,
    source: String,
    stamp_dir: String,
    extension: &'static str,
}

impl<F: Fetch> RawRecorder<F> {
    pub fn new(
        inner: F,
        base_dir: impl Into<PathBuf>,
        source: &str,
        stamp_dir: String,
        extension: &'static str,
    ) -> Self {
        RawRecorder {
            inner,
            base_dir: base_dir.into(),
            source: source.to_string(),
            stamp_dir,
            extension,
        }
    }

    fn file_name(&self, url: &str, params: &[(&str, &str)]) -> String {
        let mut key = url.to_string();
        if !params.is_empty() {
            let query: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
            key.push('?');
            key.push_str(&query.join("&"));
        }
        format!("{}.{}", sanitize_filename(&key), self.extension)
    }
}

impl<F: Fetch> Fetch for RawRecorder<F> {
    fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<String> {
        let body = self.inner.get(url, params)?;
        let name = self.file_name(url, params);
        match save_raw_response(body.as_bytes(), &self.base_dir, &self.source, &self.stamp_dir, &name) {
            Ok(path) => debug!("saved raw response to {}", path.display()),
            Err(e) => warn!("Could not save raw response for {}: {}", url, e),
        }
        Ok(body)
    }
}
