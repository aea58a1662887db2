use serde_json::Value;
use tracing::debug;

/// Metadata entry name carrying the experience level on Greenhouse boards.
pub const EXPERIENCE_LABEL: &str = "Experience (for job posting)";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(i64),
}

/// Parse `a.b[0].c` into segments. `None` on malformed input.
fn parse_path(path: &str) -> Option<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut chars = path.chars().peekable();
    let mut key = String::new();
    // A key is expected at the start and after every dot.
    let mut expect_key = true;

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if key.is_empty() && expect_key {
                    return None;
                }
                if !key.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut key)));
                }
                expect_key = true;
            }
            '[' => {
                if !key.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut key)));
                } else if expect_key && !segments.is_empty() {
                    // `a.[0]`
                    return None;
                }
                let mut digits = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(d) if d.is_ascii_digit() || (d == '-' && digits.is_empty()) => {
                            digits.push(d)
                        }
                        _ => return None,
                    }
                }
                segments.push(Segment::Index(digits.parse().ok()?));
                expect_key = false;
            }
            ']' => return None,
            _ => {
                if !expect_key {
                    // `a[0]b`
                    return None;
                }
                key.push(c);
            }
        }
    }

    if !key.is_empty() {
        segments.push(Segment::Key(key));
    } else if expect_key {
        // Empty path or trailing dot.
        return None;
    }
    Some(segments)
}

fn resolve<'a>(value: &'a Value, segments: &[Segment]) -> Option<&'a Value> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(value);
    };
    let next = match (head, value) {
        (Segment::Key(k), Value::Object(map)) => map.get(k)?,
        (Segment::Index(i), Value::Array(items)) => {
            let idx = if *i < 0 { items.len() as i64 + i } else { *i };
            items.get(usize::try_from(idx).ok()?)?
        }
        _ => return None,
    };
    resolve(next, rest)
}

/// Resolve a dotted/bracketed path. `None` means not found; a present
/// `null` comes back as `Some(&Value::Null)`.
pub fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    match parse_path(path) {
        Some(segments) => resolve(doc, &segments),
        None => {
            debug!("malformed path expression {:?}", path);
            None
        }
    }
}

/// Like [`lookup`], but `default` replaces both missing and null results.
pub fn lookup_or<'a>(doc: &'a Value, path: &str, default: &'a Value) -> &'a Value {
    match lookup(doc, path) {
        None | Some(Value::Null) => default,
        Some(v) => v,
    }
}

/// Scalar at `path` as text; empty for null, missing or container values.
pub fn lookup_string(doc: &Value, path: &str) -> String {
    static NULL: Value = Value::Null;
    scalar_text(lookup_or(doc, path, &NULL))
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

/// Experience level from a job's `metadata` list, matched case-insensitively.
pub fn parse_job_type(job: &Value) -> String {
    let Some(entries) = lookup(job, "metadata").and_then(Value::as_array) else {
        return String::new();
    };
    entries
        .iter()
        .find(|entry| lookup_string(entry, "name").to_lowercase() == EXPERIENCE_LABEL.to_lowercase())
        .map(|entry| lookup_string(entry, "value"))
        .unwrap_or_default()
}
