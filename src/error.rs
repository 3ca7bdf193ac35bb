use std::time::Duration;

use thiserror::Error;

/// Errors that abort a whole command.
///
/// Per-subdomain failures never surface here; they are folded into the
/// record as missing fields.
#[derive(Error, Debug)]
pub enum OsintError {
    #[error("Unable to resolve: {target}")]
    Unresolvable { target: String },

    #[error("Invalid domain: {0:?}")]
    InvalidDomain(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Why a single certificate probe produced nothing.
#[derive(Error, Debug)]
pub(crate) enum ProbeError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connect failed: {0}")]
    Connect(std::io::Error),

    #[error("handshake failed: {0}")]
    Handshake(std::io::Error),

    #[error("invalid server name {0:?}")]
    ServerName(String),

    #[error("TLS configuration: {0}")]
    Config(String),

    #[error("peer presented no certificate")]
    NoCertificate,

    #[error("certificate parse: {0}")]
    Parse(String),
}
