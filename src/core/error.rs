use serde::Serialize;
use thiserror::Error;

/// Failure kinds surfaced by the chain client adapter and the sync layer.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ChainError {
    #[error("no chain node configured")]
    NotConfigured,
    #[error("{what} not found on chain")]
    NotFound { what: String },
    #[error("chain node returned status {status}: {message}")]
    Server { status: u16, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("failed to decode node response: {0}")]
    Decode(String),
    #[error("rejected input: {0}")]
    Validation(String),
    #[error("operation not supported by this client: {0}")]
    Unsupported(&'static str),
}

impl ChainError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
