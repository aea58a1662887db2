use chrono::{DateTime, SecondsFormat, SubsecRound, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

/// A normalized job posting. Field order is the JSON snapshot key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub url: String,
    pub job_id: String,
    pub title: String,
    pub location: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub scraped_at: String,
}

impl JobRecord {
    /// Names of empty fields, `scraped_at` excluded.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("url", &self.url),
            ("job_id", &self.job_id),
            ("title", &self.title),
            ("location", &self.location),
            ("type", &self.job_type),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_empty())
        .map(|(k, _)| k)
        .collect()
    }

    /// Log a warning naming empty fields. `hint` says what to look at.
    pub fn warn_if_incomplete(&self, hint: &str) {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            warn!("Missing {:?} for {}: {} may need updating", missing, self.url, hint);
        }
    }
}

/// The single instant a run is stamped with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStamp(DateTime<Utc>);

impl RunStamp {
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    /// Sub-second precision is cut to microseconds.
    pub fn at(instant: DateTime<Utc>) -> Self {
        RunStamp(instant.trunc_subsecs(6))
    }

    /// ISO-8601 with `+00:00` offset, e.g. `2025-07-06T12:00:00+00:00`.
    /// A fraction, when present, always has six digits.
    pub fn scraped_at(&self) -> String {
        let precision = if self.0.nanosecond() == 0 {
            SecondsFormat::Secs
        } else {
            SecondsFormat::Micros
        };
        self.0.to_rfc3339_opts(precision, false)
    }

    /// Archive file stem, e.g. `20250706T120000Z`.
    pub fn archive_stem(&self) -> String {
        self.0.format("%Y%m%dT%H%M%SZ").to_string()
    }

    /// Raw response directory name, e.g. `20250706_120000`.
    pub fn raw_dir_name(&self) -> String {
        self.0.format("%Y%m%d_%H%M%S").to_string()
    }
}

/// Resolve a job id, deriving it from the URL when the source gave none.
pub fn resolve_job_id(explicit: String, url: &str) -> String {
    if !explicit.is_empty() {
        return explicit;
    }
    let derived = job_id_from_url(url);
    warn!("Falling back to URL-derived job_id {} for {}", derived, url);
    derived
}

/// Last non-empty path segment of `url`, ignoring query and fragment.
pub fn job_id_from_url(url: &str) -> String {
    if let Ok(parsed) = Url::parse(url) {
        return parsed
            .path_segments()
            .and_then(|segs| segs.filter(|s| !s.is_empty()).last())
            .unwrap_or_default()
            .to_string();
    }

    // Relative or otherwise unparseable: strip by hand.
    let path = url.split(['?', '#']).next().unwrap_or_default();
    path.rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> JobRecord {
        JobRecord {
            url: "https://jobs.cisco.com/jobs/ProjectDetail/A/1".into(),
            job_id: "A1".into(),
            title: "Title A".into(),
            location: String::new(),
            job_type: String::new(),
            scraped_at: String::new(),
        }
    }

    #[test]
    fn fallback_id_is_last_segment() {
        assert_eq!(job_id_from_url("https://boards-api.greenhouse.io/jobs/B/2"), "2");
        assert_eq!(job_id_from_url("https://example.com/jobs/B/2?gh_src=abc#apply"), "2");
        assert_eq!(job_id_from_url("https://example.com/jobs/B/2/"), "2");
        assert_eq!(job_id_from_url("/jobs/ProjectDetail/X/77?q=1"), "77");
    }

    #[test]
    fn fallback_id_empty_without_path() {
        assert_eq!(job_id_from_url(""), "");
        assert_eq!(job_id_from_url("https://example.com"), "");
    }

    #[test]
    fn explicit_id_wins() {
        assert_eq!(resolve_job_id("J1".into(), "https://x.test/jobs/9"), "J1");
        assert_eq!(resolve_job_id(String::new(), "https://x.test/jobs/9"), "9");
    }

    #[test]
    fn missing_fields_skip_timestamp() {
        assert_eq!(record().missing_fields(), vec!["location", "type"]);
    }

    #[test]
    fn serializes_type_key_in_order() {
        let json = serde_json::to_string(&record()).unwrap();
        assert_eq!(
            json,
            r#"{"url":"https://jobs.cisco.com/jobs/ProjectDetail/A/1","job_id":"A1","title":"Title A","location":"","type":"","scraped_at":""}"#
        );
    }

    #[test]
    fn stamp_formats() {
        let stamp = RunStamp::at(Utc.with_ymd_and_hms(2025, 7, 6, 12, 0, 0).unwrap());
        assert_eq!(stamp.scraped_at(), "2025-07-06T12:00:00+00:00");
        assert_eq!(stamp.archive_stem(), "20250706T120000Z");
        assert_eq!(stamp.raw_dir_name(), "20250706_120000");
    }

    #[test]
    fn stamp_keeps_microseconds_only() {
        let instant = Utc.with_ymd_and_hms(2025, 7, 6, 12, 0, 0).unwrap() + chrono::Duration::nanoseconds(123_456_789);
        let stamp = RunStamp::at(instant);
        assert_eq!(stamp.scraped_at(), "2025-07-06T12:00:00.123456+00:00");
        assert_eq!(stamp.archive_stem(), "20250706T120000Z");

        let round = RunStamp::at(Utc.with_ymd_and_hms(2025, 7, 6, 12, 0, 0).unwrap() + chrono::Duration::milliseconds(120));
        assert_eq!(round.scraped_at(), "2025-07-06T12:00:00.120000+00:00");

        let now = RunStamp::now().scraped_at();
        let frac = now.split('.').nth(1).map(|f| f.trim_end_matches("+00:00").len());
        assert!(matches!(frac, None | Some(6)), "{now}");
    }
}
