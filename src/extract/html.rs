use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::error::{Result, ScrapeError};

/// Class marking the value cell next to a field label on detail pages.
pub const VALUE_CLASS: &str = "fields-data_value";

static DIV: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div").unwrap());
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2.title_page-1").unwrap());
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Trim every text node and join them, so `<div> Job <b>Id</b> </div>`
/// reads as `JobId`.
pub fn normalize_text<'a>(pieces: impl Iterator<Item = &'a str>) -> String {
    pieces.map(str::trim).collect()
}

fn element_text(el: ElementRef<'_>) -> String {
    normalize_text(el.text())
}

fn is_value_cell(el: &ElementRef<'_>) -> bool {
    el.value().name() == "div" && el.value().classes().any(|c| c == VALUE_CLASS)
}

/// Value of the field labelled exactly `label`, or empty.
///
/// Finds the first `div` whose text is `label`, then the first following
/// sibling `div` carrying [`VALUE_CLASS`]. Matching is case-sensitive and
/// whole-text only.
pub fn parse_field(doc: &Html, label: &str) -> String {
    let Some(label_div) = doc.select(&DIV).find(|el| element_text(*el) == label) else {
        return String::new();
    };
    label_div
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(is_value_cell)
        .map(element_text)
        .unwrap_or_default()
}

/// Text of the first `h2.title_page-1`, or empty.
pub fn parse_job_title(doc: &Html) -> String {
    doc.select(&TITLE).next().map(element_text).unwrap_or_default()
}

/// Absolute, deduplicated detail links found inside `container` whose href
/// contains `pattern`. Fails when there are none.
pub fn collect_links(doc: &Html, container: &str, pattern: &str, base: &Url) -> Result<Vec<String>> {
    let container_sel =
        Selector::parse(container).map_err(|_| ScrapeError::Selector(container.to_string()))?;

    let mut links = HashSet::new();
    for table in doc.select(&container_sel) {
        for anchor in table.select(&ANCHOR) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if !href.contains(pattern) {
                continue;
            }
            match base.join(href) {
                Ok(url) => {
                    links.insert(url.to_string());
                }
                Err(e) => debug!("skipping unresolvable href {:?}: {}", href, e),
            }
        }
    }

    if links.is_empty() {
        return Err(ScrapeError::LinkExtraction {
            url: base.to_string(),
        });
    }
    Ok(links.into_iter().collect())
}
