use scraper::Html;
use tracing::{error, info};
use url::Url;

use super::progress_bar;
use crate::error::{Result, ScrapeError};
use crate::extract::html::{collect_links, parse_field, parse_job_title};
use crate::http::Fetch;
use crate::record::{resolve_job_id, JobRecord, RunStamp};

pub const BASE_URL: &str = "https://jobs.cisco.com/jobs/SearchJobs/";
/// Results table on the search page.
pub const LISTINGS_CONTAINER: &str = "table.table_basic-1";
/// Path fragment shared by all job detail links.
pub const DETAIL_PATTERN: &str = "/jobs/ProjectDetail/";

pub fn fetch_page(fetcher: &dyn Fetch, url: &str, params: &[(&str, &str)]) -> Result<Html> {
    let body = fetcher.get(url, params)?;
    Ok(Html::parse_document(&body))
}

pub fn fetch_listings_page(fetcher: &dyn Fetch, params: &[(&str, &str)]) -> Result<Html> {
    fetch_page(fetcher, BASE_URL, params)
}

/// Absolute detail URLs on the listings page, deduplicated.
pub fn get_job_links(listings: &Html) -> Result<Vec<String>> {
    let base = Url::parse(BASE_URL).map_err(|source| ScrapeError::Url {
        url: BASE_URL.to_string(),
        source,
    })?;
    collect_links(listings, LISTINGS_CONTAINER, DETAIL_PATTERN, &base)
}

pub fn build_record(url: &str, detail: &Html, scraped_at: &str) -> JobRecord {
    let location = match parse_field(detail, "Location:") {
        loc if loc.is_empty() => parse_field(detail, "Location"),
        loc => loc,
    };
    JobRecord {
        url: url.to_string(),
        job_id: resolve_job_id(parse_field(detail, "Job Id"), url),
        title: parse_job_title(detail),
        location,
        job_type: parse_field(detail, "Job Type"),
        scraped_at: scraped_at.to_string(),
    }
}

/// Listings, then every detail page one at a time. A detail page that
/// cannot be fetched is logged and skipped.
pub fn run(fetcher: &dyn Fetch, stamp: &RunStamp, params: &[(&str, &str)]) -> Result<Vec<JobRecord>> {
    let listings = fetch_listings_page(fetcher, params)?;
    let links = get_job_links(&listings)?;
    info!("Found {} job links", links.len());

    let scraped_at = stamp.scraped_at();
    let pb = progress_bar(links.len());
    let mut results = Vec::with_capacity(links.len());

    for url in &links {
        match fetch_page(fetcher, url, &[]) {
            Ok(detail) => {
                let record = build_record(url, &detail, &scraped_at);
                record.warn_if_incomplete("selectors");
                results.push(record);
            }
            Err(e) => error!("✖ Failed to fetch {}: {}", url, e),
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("Built {} of {} Cisco records", results.len(), links.len());
    Ok(results)
}
