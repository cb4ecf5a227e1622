//! Error types for the AWS clients.

use std::path::PathBuf;

/// Errors produced while talking to S3 or CloudFront.
#[derive(Debug, thiserror::Error)]
pub enum AwsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AWS responded with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed bucket listing: {0}")]
    MalformedListing(String),

    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("could not sign request: {0}")]
    Signing(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("could not read file {}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
