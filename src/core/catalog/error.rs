//! Catalog Error Types
//!
//! Error handling for the remote catalog client.

use thiserror::Error;

/// Catalog API errors
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Catalog returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Malformed catalog response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Failed to read image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl CatalogError {
    /// Short message suitable for a one-line status area.
    pub fn user_message(&self) -> String {
        match self {
            Self::Http(e) if e.is_timeout() => "The catalog did not respond in time".to_string(),
            Self::Http(e) if e.is_connect() => "Could not reach the catalog".to_string(),
            Self::Validation(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;
