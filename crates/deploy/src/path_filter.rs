//! Local file classification.
//!
//! Walks the source tree, drops ignored files and attaches the headers
//! of every matching metadata rule to the rest.

use std::path::Path;

use regex::Regex;
use static_deploy_model::{FileEntry, Header, WorkBatch};
use tracing::debug;

use crate::error::DeployError;

/// A metadata rule as configured: a pattern and the headers it adds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRule {
    pub pattern: String,
    pub headers: Vec<Header>,
}

impl MetadataRule {
    pub fn new(pattern: impl Into<String>, headers: Vec<Header>) -> Self {
        Self {
            pattern: pattern.into(),
            headers,
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    regex: Regex,
    headers: Vec<Header>,
}

/// Precompiled ignore pattern and metadata rules.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    ignore: Option<Regex>,
    rules: Vec<CompiledRule>,
}

fn compile(pattern: &str) -> Result<Regex, DeployError> {
    Regex::new(pattern).map_err(|source| DeployError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

impl PathFilter {
    /// Compiles every pattern up front. An empty ignore pattern ignores nothing.
    pub fn new(ignore: Option<&str>, rules: &[MetadataRule]) -> Result<Self, DeployError> {
        let ignore = ignore
            .filter(|p| !p.is_empty())
            .map(compile)
            .transpose()?;

        let rules = rules
            .iter()
            .map(|rule| {
                Ok(CompiledRule {
                    regex: compile(&rule.pattern)?,
                    headers: rule.headers.clone(),
                })
            })
            .collect::<Result<Vec<_>, DeployError>>()?;

        Ok(Self { ignore, rules })
    }

    /// Whether `path` (the full walked path) matches the ignore pattern.
    pub fn is_ignored(&self, path: &Path) -> bool {
        self.ignore
            .as_ref()
            .is_some_and(|re| re.is_match(&path.to_string_lossy()))
    }

    /// Headers of every rule matching `upload_key`, in rule order.
    pub fn headers_for(&self, upload_key: &str) -> Vec<Header> {
        self.rules
            .iter()
            .filter(|rule| rule.regex.is_match(upload_key))
            .flat_map(|rule| rule.headers.iter().cloned())
            .collect()
    }

    /// Walks `source_root` and builds the batch of files to upload.
    ///
    /// Any I/O failure during the walk fails the whole classification.
    pub fn classify(&self, source_root: &Path) -> Result<WorkBatch, DeployError> {
        let unavailable = |source| DeployError::SourceUnavailable {
            path: source_root.to_path_buf(),
            source,
        };

        let metadata = std::fs::metadata(source_root).map_err(unavailable)?;
        if !metadata.is_dir() {
            return Err(unavailable(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                "not a directory",
            )));
        }

        let mut batch = WorkBatch::new();
        self.walk_dir(source_root, source_root, &mut batch)?;

        debug!(root = %source_root.display(), files = batch.len(), "source classified");
        Ok(batch)
    }

    fn walk_dir(&self, root: &Path, current: &Path, batch: &mut WorkBatch) -> Result<(), DeployError> {
        let traversal = |path: &Path| {
            let path = path.to_path_buf();
            move |source| DeployError::Traversal { path, source }
        };

        let entries = std::fs::read_dir(current).map_err(traversal(current))?;

        for entry in entries {
            let entry = entry.map_err(traversal(current))?;
            let path = entry.path();
            let mut file_type = entry.file_type().map_err(traversal(&path))?;

            if file_type.is_symlink() {
                // Follow links to files; linked directories are not walked.
                file_type = std::fs::metadata(&path).map_err(traversal(&path))?.file_type();
                if file_type.is_dir() {
                    debug!(path = %path.display(), "skipping symlinked directory");
                    continue;
                }
            }

            if file_type.is_dir() {
                self.walk_dir(root, &path, batch)?;
            } else if file_type.is_file() {
                if self.is_ignored(&path) {
                    debug!(path = %path.display(), "ignored");
                    continue;
                }

                let key = upload_key(root, &path)?;
                let headers = self.headers_for(&key);
                batch.insert(FileEntry::new(path, key, headers));
            }
        }

        Ok(())
    }
}

/// Path relative to `root`, `/` separated.
fn upload_key(root: &Path, path: &Path) -> Result<String, DeployError> {
    let rel = path.strip_prefix(root).map_err(|e| DeployError::Traversal {
        path: path.to_path_buf(),
        source: std::io::Error::other(e),
    })?;

    Ok(rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

/// Compiles the patterns and classifies `source_root` in one step.
pub fn classify(
    source_root: &Path,
    ignore_pattern: Option<&str>,
    metadata_rules: &[MetadataRule],
) -> Result<WorkBatch, DeployError> {
    PathFilter::new(ignore_pattern, metadata_rules)?.classify(source_root)
}
