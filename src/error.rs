//! Error types shared by every layer of the client.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the relation client.
///
/// Only the configuration variants are expected to reach a caller of the
/// high-level operations. Pagination and mutation fold the others into
/// partial results or boolean outcomes.
#[derive(Debug, Error)]
pub enum Error {
    /// No configuration file at the expected location
    #[error("config file {} not found", path.display())]
    ConfigMissing { path: PathBuf },

    /// Configuration present but unparseable or structurally invalid
    #[error("malformed config: {0}")]
    ConfigMalformed(String),

    /// Every attempt of a single request failed
    #[error("request failed after {retries} retries")]
    RequestExhausted { retries: u32 },

    /// Well-formed response carrying a non-zero result code
    #[error("remote rejected request (code {code}): {message}")]
    RemoteRejected { code: i64, message: String },

    /// Response body did not match the expected envelope
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Connection, TLS or timeout failure below the HTTP status level
    #[error("transport error: {0}")]
    Transport(String),

    /// Imported account list is not a usable JSON array
    #[error("invalid import file: {0}")]
    InvalidImport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Configuration errors halt the client before any network activity.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::ConfigMissing { .. } | Self::ConfigMalformed(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
