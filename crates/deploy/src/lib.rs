//! Static site deploy flow: classify, diff, upload, invalidate.
//!
//! This crate holds the deploy logic only. Remote services are reached
//! through the [`Transport`], [`InventorySource`] and [`Invalidator`]
//! seams, which the CLI backs with the AWS clients.
//!
//! # Pipeline
//!
//! 1. **Classify**: walk the source tree, drop ignored files, attach headers
//! 2. **Delta** (optional): fetch the bucket inventory and keep changed files
//! 3. **Upload**: run the batch through the bounded scheduler
//! 4. **Invalidate**: submit the configured CloudFront paths
//!
//! [`Transport`]: static_deploy_transfer::Transport

pub mod context;
pub mod delta;
pub mod deployer;
pub mod error;
pub mod path_filter;
pub mod remote;

pub use context::DeployContext;
pub use delta::{decide, filter_changed, local_state};
pub use deployer::{DeploySummary, Deployer};
pub use error::DeployError;
pub use path_filter::{MetadataRule, PathFilter, classify};
pub use remote::{InventorySource, Invalidator};
