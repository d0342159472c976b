use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Endpoint or credential missing. Raised before any I/O.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Record text is not valid JSON. Raised before any I/O.
    #[error("{message}: {source}")]
    PayloadParse {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("Remote rejection: {status}")]
    Remote {
        status: u16,
        body: serde_json::Value,
    },

    #[error("Config store error: {0}")]
    ConfigStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn payload_parse(message: impl Into<String>, source: serde_json::Error) -> Self {
        Error::PayloadParse {
            message: message.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
