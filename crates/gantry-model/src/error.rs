use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid environment name: {0}")]
    InvalidEnvironment(String),

    #[error("unknown admission strategy: {0}")]
    UnknownAdmission(String),

    #[error("unknown jitter strategy: {0}")]
    UnknownJitter(String),

    #[error("unknown scaler kind: {0}")]
    UnknownScaler(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
