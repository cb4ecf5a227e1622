//! Concurrent upload scheduling with progress reporting.
//!
//! The [`TransferScheduler`] runs one task per [`WorkBatch`] entry and
//! bounds how many of them may talk to the remote store at once. The
//! actual upload is an injected [`Transport`], which keeps the scheduler
//! testable without a network.
//!
//! [`WorkBatch`]: static_deploy_model::WorkBatch

mod checksum;
mod progress;
mod scheduler;
mod transport;

pub use checksum::{calculate_file_checksum, checksum_bytes};
pub use progress::{MemoryBuffer, ProgressSink};
pub use scheduler::{RunMode, TransferOutcome, TransferReport, TransferScheduler};
pub use transport::Transport;

use std::path::PathBuf;

/// Boxed error produced by a [`Transport`] implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("could not read file {}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not upload {key}")]
    Upload {
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("transfer task failed: {0}")]
    Task(String),

    #[error("cancelled")]
    Cancelled,
}

impl TransferError {
    /// Wraps a transport-level failure for the object stored under `key`.
    pub fn upload(key: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Upload {
            key: key.into(),
            source: source.into(),
        }
    }
}
