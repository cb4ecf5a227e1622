use std::future::Future;
use std::pin::Pin;

use static_deploy_model::FileEntry;

use crate::TransferError;

/// Uploads a single file to the remote store.
///
/// The scheduler only depends on this trait; the S3 client implements it
/// for real runs and tests substitute instrumented mocks.
pub trait Transport: Send + Sync {
    /// Uploads `entry` with its headers, in order, and returns the
    /// response body (empty if the store sent none).
    fn put<'a>(
        &'a self,
        entry: &'a FileEntry,
    ) -> Pin<Box<dyn Future<Output = Result<String, TransferError>> + Send + 'a>>;
}
