//! Error types for chunkfs

use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === Request Errors ===
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // === Placement Errors ===
    #[error("No storage nodes configured")]
    NoStorageNodesConfigured,

    #[error(
        "Topology changed for {file}: uploaded under {recorded}, current node list is {current}"
    )]
    TopologyChanged {
        file: String,
        recorded: String,
        current: String,
    },

    // === Reassembly Errors ===
    #[error("Incomplete data: missing chunk indices {missing:?}")]
    IncompleteData { missing: Vec<usize> },

    #[error("Duplicate chunk index: {0}")]
    DuplicateIndex(usize),

    // === Storage Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Metadata corrupted: {0}")]
    MetadataCorrupted(String),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Network Errors ===
    #[error("HTTP error: {0}")]
    Http(String),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convert to HTTP status code
    pub fn to_http_status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Error::InvalidArgument(_) | Error::DuplicateIndex(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::TopologyChanged { .. } => StatusCode::CONFLICT,
            Error::NoStorageNodesConfigured => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Was this raised because the target simply does not exist?
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.to_http_status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }
        (status, axum::Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e.to_string())
    }
}
