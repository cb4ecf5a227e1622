//! Immutable per-run deploy settings.

use std::path::PathBuf;

use static_deploy_transfer::RunMode;

use crate::path_filter::PathFilter;

/// Everything a [`Deployer`](crate::Deployer) needs to know about one run.
///
/// Built once from validated configuration and flags, then only read.
#[derive(Debug, Clone)]
pub struct DeployContext {
    /// Root of the local tree to upload.
    pub source: PathBuf,
    pub filter: PathFilter,
    /// Maximum concurrent uploads; 0 is treated as 1.
    pub parallel: usize,
    /// CloudFront paths to invalidate after a successful upload.
    pub invalidation: Vec<String>,
    pub mode: RunMode,
    /// Only upload files the bucket does not already have.
    pub delta: bool,
}

impl DeployContext {
    pub fn new(source: impl Into<PathBuf>, filter: PathFilter) -> Self {
        Self {
            source: source.into(),
            filter,
            parallel: 1,
            invalidation: Vec::new(),
            mode: RunMode::Live,
            delta: false,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.mode == RunMode::DryRun
    }
}
