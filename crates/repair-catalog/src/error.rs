use repair_common::error::CommonError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("repair catalog is still loading")]
    Loading,

    #[error("repair catalog unavailable: {0}")]
    Unavailable(String),

    #[error("repair case not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Common(#[from] CommonError),
}
