//! Error types for NukeChat Core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Payload decode error: {0}")]
    PayloadDecode(String),

    #[error("Message not saved after {attempts} attempts: {source}")]
    SaveExhausted {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
