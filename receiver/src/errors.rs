use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid or missing API key")]
    Unauthorized,

    #[error("Malformed request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
