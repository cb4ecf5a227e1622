//! Deploy error types.

use std::path::PathBuf;

use static_deploy_aws::AwsError;
use static_deploy_transfer::TransferError;

/// Errors produced during a deploy run.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("invalid pattern {pattern:?}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("source directory {} is not available", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not walk {}", path.display())]
    Traversal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed bucket inventory: {0}")]
    MalformedInventory(String),

    #[error("could not fetch bucket inventory")]
    Inventory(#[source] AwsError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("invalidation failed")]
    Invalidation(#[source] AwsError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("background task failed: {0}")]
    Task(String),
}

impl DeployError {
    /// Maps a listing failure, keeping malformed responses distinct.
    pub fn from_listing(err: AwsError) -> Self {
        match err {
            AwsError::MalformedListing(msg) => Self::MalformedInventory(msg),
            other => Self::Inventory(other),
        }
    }
}
