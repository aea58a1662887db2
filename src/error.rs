use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The listings page parsed but held no detail links. Almost always a
    /// markup change on the site, not an empty job board.
    #[error("no job links found on listings page {url}: selector may be broken")]
    LinkExtraction { url: String },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {url} returned {status}")]
    Status { url: String, status: u16 },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid URL {url}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid selector {0:?}")]
    Selector(String),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
