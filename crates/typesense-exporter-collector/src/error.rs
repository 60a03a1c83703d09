use thiserror::Error;

/// Failure kinds for one scrape of an upstream endpoint.
///
/// All three are handled identically at the collector boundary (logged,
/// surfaced as the up gauge flipping to 0); `Parse` additionally feeds the
/// per-collector parse-failure counter.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("failed to decode response from {url}: {reason}")]
    Parse { url: String, reason: String },
}

impl ScrapeError {
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}
