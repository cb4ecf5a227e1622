//! static-deploy: upload a static site to S3 and invalidate CloudFront.

mod cli;
mod config;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use static_deploy_aws::{CloudFrontClient, S3Client};
use static_deploy_core::Deployer;
use static_deploy_transfer::{ProgressSink, RunMode};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::{ConfigFile, Settings};

#[tokio::main]
async fn main() -> ExitCode {
    // Diagnostics go to stderr; stdout carries the progress lines.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse_args();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = ConfigFile::load(&cli.config)?
        .into_settings(|var| std::env::var(var).ok())
        .context("invalid configuration")?;

    settings.context.delta = cli.delta;
    if cli.dry_run {
        settings.context.mode = RunMode::DryRun;
    }

    let sink = if cli.silent {
        ProgressSink::discard()
    } else {
        ProgressSink::stdout()
    };

    let deployer = build_deployer(&settings, sink)?;
    spawn_ctrl_c_handler(deployer.cancel_token());

    info!(
        config = %cli.config.display(),
        bucket = %settings.bucket,
        dry_run = cli.dry_run,
        delta = cli.delta,
        "deploy starting"
    );
    deployer.run(&settings.context).await?;
    Ok(())
}

fn build_deployer(settings: &Settings, sink: ProgressSink) -> Result<Deployer> {
    let mut s3 = S3Client::new(&settings.bucket, &settings.region, settings.credentials.clone())
        .context("could not create S3 client")?;
    if let Some(endpoint) = &settings.endpoint {
        s3 = s3.with_endpoint(endpoint);
    }
    let s3 = Arc::new(s3);

    let mut deployer = Deployer::new(s3.clone(), sink).with_inventory(s3);

    if let Some(id) = &settings.distribution_id {
        let cloudfront = CloudFrontClient::new(id, settings.credentials.clone())
            .context("could not create CloudFront client")?;
        deployer = deployer.with_invalidator(Arc::new(cloudfront));
    }

    Ok(deployer)
}

/// Cancels pending uploads on Ctrl-C; uploads already in flight finish.
fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("interrupted, cancelling pending uploads");
                cancel.cancel();
            }
            Err(e) => warn!(error = %e, "could not listen for Ctrl-C"),
        }
    });
}
