//! Deploy pipeline: classify, optionally diff, upload, invalidate.

use std::sync::Arc;

use static_deploy_model::WorkBatch;
use static_deploy_transfer::{ProgressSink, TransferScheduler, Transport};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::context::DeployContext;
use crate::delta::filter_changed;
use crate::error::DeployError;
use crate::remote::{InventorySource, Invalidator};

/// What a successful run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeploySummary {
    /// Files found in the source tree after ignore filtering.
    pub discovered: usize,
    /// Files uploaded (or visited in a dry run).
    pub uploaded: usize,
    /// CloudFront paths submitted (or printed in a dry run).
    pub invalidated: usize,
}

/// Runs one deploy against injected remote services.
pub struct Deployer {
    transport: Arc<dyn Transport>,
    inventory: Option<Arc<dyn InventorySource>>,
    invalidator: Option<Arc<dyn Invalidator>>,
    sink: ProgressSink,
    cancel: CancellationToken,
}

impl Deployer {
    pub fn new(transport: Arc<dyn Transport>, sink: ProgressSink) -> Self {
        Self {
            transport,
            inventory: None,
            invalidator: None,
            sink,
            cancel: CancellationToken::new(),
        }
    }

    /// Required for delta runs.
    pub fn with_inventory(mut self, inventory: Arc<dyn InventorySource>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    /// Required when the context lists invalidation paths.
    pub fn with_invalidator(mut self, invalidator: Arc<dyn Invalidator>) -> Self {
        self.invalidator = Some(invalidator);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns a token that stops the run before pending uploads start.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the whole pipeline for `ctx`.
    ///
    /// Stops at the first failing stage. Uploads that already completed
    /// are not rolled back.
    pub async fn run(&self, ctx: &DeployContext) -> Result<DeploySummary, DeployError> {
        self.check_services(ctx)?;

        let batch = self.classify(ctx).await?;
        let discovered = batch.len();

        let batch = if ctx.delta {
            self.changed_only(batch).await?
        } else {
            batch
        };

        let report = TransferScheduler::new(ctx.parallel)
            .with_mode(ctx.mode)
            .with_delta(ctx.delta)
            .with_cancel(self.cancel.clone())
            .run(batch, Arc::clone(&self.transport), &self.sink)
            .await?;

        let invalidated = self.invalidate(ctx).await?;

        info!(discovered, uploaded = report.files, invalidated, "deploy finished");
        Ok(DeploySummary {
            discovered,
            uploaded: report.files,
            invalidated,
        })
    }

    /// Fails before any file is touched if `ctx` needs a service that was not injected.
    fn check_services(&self, ctx: &DeployContext) -> Result<(), DeployError> {
        if ctx.delta && self.inventory.is_none() {
            return Err(DeployError::Config("delta mode needs a bucket inventory".into()));
        }
        if !ctx.invalidation.is_empty() && !ctx.is_dry_run() && self.invalidator.is_none() {
            warn!(
                paths = ctx.invalidation.len(),
                "invalidation paths configured without a distribution"
            );
            return Err(DeployError::Config(
                "invalidation paths need a CloudFront distribution".into(),
            ));
        }
        Ok(())
    }

    async fn classify(&self, ctx: &DeployContext) -> Result<WorkBatch, DeployError> {
        let filter = ctx.filter.clone();
        let source = ctx.source.clone();

        tokio::task::spawn_blocking(move || filter.classify(&source))
            .await
            .map_err(|e| DeployError::Task(e.to_string()))?
    }

    async fn changed_only(&self, batch: WorkBatch) -> Result<WorkBatch, DeployError> {
        let source = self
            .inventory
            .as_ref()
            .ok_or_else(|| DeployError::Config("delta mode needs a bucket inventory".into()))?;

        let inventory = source.fetch().await?;
        info!(records = inventory.len(), "remote inventory fetched");

        tokio::task::spawn_blocking(move || filter_changed(batch, &inventory))
            .await
            .map_err(|e| DeployError::Task(e.to_string()))?
    }

    async fn invalidate(&self, ctx: &DeployContext) -> Result<usize, DeployError> {
        let paths = &ctx.invalidation;
        if paths.is_empty() {
            return Ok(0);
        }

        self.sink
            .line(format_args!("Invalidating {} Cloudfront URLs", paths.len()));

        if ctx.is_dry_run() {
            for path in paths {
                self.sink.line(path);
            }
            return Ok(paths.len());
        }

        let invalidator = self.invalidator.as_ref().ok_or_else(|| {
            DeployError::Config("invalidation paths need a CloudFront distribution".into())
        })?;

        let body = invalidator.invalidate(paths).await?;
        if !body.is_empty() {
            self.sink.raw(body.as_bytes());
        }
        Ok(paths.len())
    }
}
