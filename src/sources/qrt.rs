use serde_json::Value;
use tracing::{info, warn};

use crate::error::Result;
use crate::extract::json::{lookup, lookup_string, parse_job_type};
use crate::http::Fetch;
use crate::record::{resolve_job_id, JobRecord, RunStamp};

pub const BASE_URL: &str = "https://boards-api.greenhouse.io/v1/boards/quberesearchandtechnologies/jobs";

pub fn fetch_listings_page(fetcher: &dyn Fetch, params: &[(&str, &str)]) -> Result<Value> {
    let body = fetcher.get(BASE_URL, params)?;
    Ok(serde_json::from_str(&body)?)
}

pub fn build_record(job: &Value, scraped_at: &str) -> JobRecord {
    let url = lookup_string(job, "absolute_url");
    JobRecord {
        job_id: resolve_job_id(lookup_string(job, "id"), &url),
        title: lookup_string(job, "title"),
        location: lookup_string(job, "location.name"),
        job_type: parse_job_type(job),
        scraped_at: scraped_at.to_string(),
        url,
    }
}

/// Every job embedded in the listings response; no per-job requests.
pub fn run(fetcher: &dyn Fetch, stamp: &RunStamp, params: &[(&str, &str)]) -> Result<Vec<JobRecord>> {
    let data = fetch_listings_page(fetcher, params)?;
    let jobs: &[Value] = match lookup(&data, "jobs") {
        Some(Value::Array(jobs)) => jobs.as_slice(),
        None | Some(Value::Null) => {
            warn!("No jobs array in response from {}", BASE_URL);
            &[]
        }
        Some(other) => {
            warn!("Expected jobs array from {}, got {}", BASE_URL, kind(other));
            &[]
        }
    };

    let scraped_at = stamp.scraped_at();
    let results: Vec<JobRecord> = jobs
        .iter()
        .map(|job| {
            let record = build_record(job, &scraped_at);
            record.warn_if_incomplete("json paths");
            record
        })
        .collect();

    info!("Built {} QRT records", results.len());
    Ok(results)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrapeError;
    use crate::sources::testing::{fixture, frozen_stamp, FakeFetch, FIXED_TS};
    use serde_json::json;

    fn job(id: &str, title: &str, loc: &str, typ: &str, url: &str) -> Value {
        json!({
            "id": id,
            "absolute_url": url,
            "title": title,
            "location": {"name": loc},
            "metadata": [{"name": "Experience (for job posting)", "value": typ}],
        })
    }

    #[test]
    fn run_produces_expected_records() {
        let url_a = "https://boards-api.greenhouse.io/jobs/A/1";
        let url_b = "https://boards-api.greenhouse.io/jobs/B/2";
        let listings = json!({"jobs": [
            job("J1", "Title A", "Loc A", "Type A", url_a),
            job("", "Title B", "Loc B", "Type B", url_b),
        ]});
        let fetcher = FakeFetch::default().with(BASE_URL, listings.to_string());

        let mut records = run(&fetcher, &frozen_stamp(), &[]).unwrap();
        records.sort_by(|a, b| a.url.cmp(&b.url));
        assert_eq!(
            records,
            vec![
                JobRecord {
                    url: url_a.into(),
                    job_id: "J1".into(),
                    title: "Title A".into(),
                    location: "Loc A".into(),
                    job_type: "Type A".into(),
                    scraped_at: FIXED_TS.into(),
                },
                JobRecord {
                    url: url_b.into(),
                    job_id: "2".into(),
                    title: "Title B".into(),
                    location: "Loc B".into(),
                    job_type: "Type B".into(),
                    scraped_at: FIXED_TS.into(),
                },
            ]
        );
    }

    #[test]
    fn fixture_listings() {
        let fetcher = FakeFetch::default().with(BASE_URL, fixture("qrt_jobs.json"));
        let records = run(&fetcher, &frozen_stamp(), &[]).unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].job_id, "4512345101");
        assert_eq!(records[0].location, "London");
        assert_eq!(records[0].job_type, "Students");

        // Null id: fallback strips the query string.
        assert_eq!(records[1].job_id, "4512345202");
        assert_eq!(records[1].job_type, "Experienced");

        assert_eq!(records[2].location, "");
        assert_eq!(records[2].job_type, "");
        assert!(records.iter().all(|r| r.scraped_at == FIXED_TS));
    }

    #[test]
    fn missing_or_odd_jobs_key_yields_nothing() {
        for body in [r#"{}"#, r#"{"jobs": null}"#, r#"{"jobs": {"id": 1}}"#] {
            let fetcher = FakeFetch::default().with(BASE_URL, body);
            assert!(run(&fetcher, &frozen_stamp(), &[]).unwrap().is_empty(), "{body}");
        }
    }

    #[test]
    fn malformed_json_is_fatal() {
        let fetcher = FakeFetch::default().with(BASE_URL, "<html>maintenance</html>");
        let err = run(&fetcher, &frozen_stamp(), &[]).unwrap_err();
        assert!(matches!(err, ScrapeError::Json(_)));
    }

    #[test]
    fn listings_params_forwarded() {
        let fetcher = FakeFetch::default().with(BASE_URL, r#"{"jobs": []}"#);
        run(&fetcher, &frozen_stamp(), &[("content", "true")]).unwrap();
        let requests = fetcher.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1, vec![("content".to_string(), "true".to_string())]);
    }

    #[test]
    fn numeric_id_is_stringified() {
        let record = build_record(&json!({"id": 42, "absolute_url": "https://x.test/jobs/9"}), FIXED_TS);
        assert_eq!(record.job_id, "42");
        assert_eq!(record.title, "");
    }
}
