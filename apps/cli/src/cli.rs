//! Command-line flags.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

/// Deploy a static site to S3 and invalidate CloudFront.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "static-deploy")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./config.yml")]
    pub config: PathBuf,

    /// Show what would be uploaded and invalidated without doing it (also -dr)
    #[arg(long)]
    pub dry_run: bool,

    /// Omit all progress output
    #[arg(short, long)]
    pub silent: bool,

    /// Only upload files that changed compared to the bucket
    #[arg(short, long)]
    pub delta: bool,
}

impl Cli {
    /// Parses the process arguments.
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }
}

/// Rewrites the single-dash `-dr` shorthand to `--dry-run`.
///
/// clap would otherwise read `-dr` as `-d -r`.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            if arg == "-dr" {
                OsString::from("--dry-run")
            } else {
                arg
            }
        })
        .collect()
}
