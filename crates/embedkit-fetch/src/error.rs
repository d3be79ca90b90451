use embedkit_core::BuildError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("resource not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid embed URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("provider data for {url} is not an embeddable asset: {source}")]
    InvalidAsset {
        url: String,
        #[source]
        source: BuildError,
    },
}
