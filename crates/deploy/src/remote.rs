//! Seams between the deploy flow and the remote services.
//!
//! The CLI wires in the AWS clients; tests substitute in-memory fakes.

use std::future::Future;
use std::pin::Pin;

use static_deploy_aws::{CloudFrontClient, S3Client};
use static_deploy_model::Inventory;

use crate::error::DeployError;

/// Source of the current bucket contents.
pub trait InventorySource: Send + Sync {
    fn fetch(&self) -> Pin<Box<dyn Future<Output = Result<Inventory, DeployError>> + Send + '_>>;
}

/// Cache invalidation after a successful upload.
pub trait Invalidator: Send + Sync {
    /// Invalidates `paths`; returns the raw service response.
    fn invalidate<'a>(
        &'a self,
        paths: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<String, DeployError>> + Send + 'a>>;
}

impl InventorySource for S3Client {
    fn fetch(&self) -> Pin<Box<dyn Future<Output = Result<Inventory, DeployError>> + Send + '_>> {
        Box::pin(async move { self.list_objects().await.map_err(DeployError::from_listing) })
    }
}

impl Invalidator for CloudFrontClient {
    fn invalidate<'a>(
        &'a self,
        paths: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<String, DeployError>> + Send + 'a>> {
        Box::pin(async move {
            self.create_invalidation(paths)
                .await
                .map_err(DeployError::Invalidation)
        })
    }
}
