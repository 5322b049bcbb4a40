//! Error types for PowBench.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Backend unavailable at {0}.")]
    Offline(String),

    #[error("A batch is already running")]
    BatchInProgress,

    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
