use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("Bulletin source unavailable: {0}")]
    Unavailable(String),
}
