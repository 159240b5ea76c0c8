use thiserror::Error;

/// Client construction errors. Request failures are reported as
/// [`gantry_core::api::ApiError`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("api key is empty")]
    MissingApiKey,

    #[error("retry policy needs at least one attempt")]
    NoAttempts,

    #[error("failed to build http client: {0}")]
    Build(#[from] reqwest::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;
