/// Error types shared by the repair catalog crates.
///
/// These cover the headless CMS the service reads from. Redis failures never surface as
/// errors; see `crate::redis`.
/// Service-specific errors live in each binary crate and wrap `CommonError` via `#[from]`.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("cms request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid cms response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("cms returned error: status={status} message={message}")]
    Upstream {
        status: reqwest::StatusCode,
        message: String,
    },
}
