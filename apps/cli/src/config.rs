//! Configuration file loading and validation.
//!
//! The file is YAML by default (`config.yml`); a `.toml` extension
//! switches to TOML with the same shape.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use static_deploy_aws::{Credentials, validate_header};
use static_deploy_core::{DeployContext, MetadataRule, PathFilter};
use static_deploy_model::Header;

const ACCESS_KEY_ENV: &str = "AWS_ACCESS_KEY_ID";
const SECRET_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";

/// On-disk configuration, as written by the user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub auth: AuthConfig,
    pub s3: S3Config,
    pub cloudfront: CloudFrontConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub accesskey: String,
    pub key: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct S3Config {
    pub bucket: BucketConfig,
    pub parallel: i64,
    pub source: String,
    pub ignore: Option<String>,
    pub metadata: Vec<MetadataConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BucketConfig {
    pub name: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub regex: String,
    /// Each map contributes its pairs in document order.
    pub headers: Vec<Mapping>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CloudFrontConfig {
    pub distribution: DistributionConfig,
    pub invalidation: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    pub id: String,
}

/// Validated settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub credentials: Credentials,
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    /// Set whenever invalidation paths are configured.
    pub distribution_id: Option<String>,
    pub context: DeployContext,
}

impl ConfigFile {
    /// Reads and parses the file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("could not read config file {}", path.display()))?;
        Self::parse(&text, is_toml(path))
            .with_context(|| format!("could not parse config {}", path.display()))
    }

    pub fn parse(text: &str, toml: bool) -> Result<Self> {
        if toml {
            Ok(toml::from_str(text)?)
        } else if text.trim().is_empty() {
            Ok(Self::default())
        } else {
            Ok(serde_yaml::from_str(text)?)
        }
    }

    /// Validates everything up front and builds the run settings.
    ///
    /// `env` looks up environment variables; credentials missing from the
    /// file fall back to `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`.
    pub fn into_settings(self, env: impl Fn(&str) -> Option<String>) -> Result<Settings> {
        let credentials = resolve_credentials(&self.auth, env)?;

        let s3 = self.s3;
        if s3.bucket.name.is_empty() {
            bail!("no bucket specified");
        }
        if s3.source.is_empty() {
            bail!("no source specified");
        }

        let invalidation = self.cloudfront.invalidation;
        let id = self.cloudfront.distribution.id;
        if id.is_empty() && !invalidation.is_empty() {
            bail!("no distribution specified");
        }
        let distribution_id = Some(id).filter(|id| !id.is_empty());

        let rules = s3
            .metadata
            .iter()
            .map(|m| Ok(MetadataRule::new(&m.regex, headers_from(&m.headers)?)))
            .collect::<Result<Vec<_>>>()?;
        let filter = PathFilter::new(s3.ignore.as_deref(), &rules)?;

        let mut context = DeployContext::new(PathBuf::from(&s3.source), filter);
        context.parallel = parallelism(s3.parallel);
        context.invalidation = invalidation;

        Ok(Settings {
            credentials,
            bucket: s3.bucket.name,
            region: s3.bucket.region.unwrap_or_default(),
            endpoint: s3.bucket.endpoint.filter(|e| !e.is_empty()),
            distribution_id,
            context,
        })
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

/// Zero or negative means one upload at a time.
fn parallelism(configured: i64) -> usize {
    usize::try_from(configured)
        .ok()
        .filter(|&p| p > 0)
        .unwrap_or(1)
}

/// File values win; each missing half falls back to the environment.
fn resolve_credentials(
    auth: &AuthConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Credentials> {
    let pick = |configured: &str, var: &str| {
        Some(configured.to_string())
            .filter(|v| !v.is_empty())
            .or_else(|| env(var).filter(|v| !v.is_empty()))
    };

    match (
        pick(&auth.accesskey, ACCESS_KEY_ENV),
        pick(&auth.key, SECRET_KEY_ENV),
    ) {
        (Some(access), Some(secret)) => Ok(Credentials::new(access, secret)),
        _ => bail!("no aws credentials found"),
    }
}

fn headers_from(maps: &[Mapping]) -> Result<Vec<Header>> {
    let mut headers = Vec::new();
    for map in maps {
        for (name, value) in map {
            let name = scalar(name).context("header name must be a string")?;
            let value = scalar(value)
                .with_context(|| format!("header {name:?} must have a scalar value"))?;

            let header = Header::new(name, value);
            validate_header(&header)?;
            headers.push(header);
        }
    }
    Ok(headers)
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
