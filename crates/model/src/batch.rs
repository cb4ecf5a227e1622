use std::collections::HashMap;
use std::collections::hash_map;
use std::path::{Path, PathBuf};

/// A single HTTP header attached to an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A local file selected for upload.
///
/// Entries are immutable once built: the path filter creates them and
/// every later stage only reads them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    local_path: PathBuf,
    upload_key: String,
    headers: Vec<Header>,
}

impl FileEntry {
    pub fn new(local_path: PathBuf, upload_key: String, headers: Vec<Header>) -> Self {
        Self {
            local_path,
            upload_key,
            headers,
        }
    }

    /// Path of the file on the local filesystem, as walked.
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Key the file is stored under remotely (source root stripped, `/` separated).
    pub fn upload_key(&self) -> &str {
        &self.upload_key
    }

    /// Headers in the order the metadata rules produced them.
    ///
    /// Duplicates are kept: a header set by two rules appears twice.
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }
}

/// The set of files selected for transfer in one run.
///
/// Keyed by local path; iteration order is unspecified.
#[derive(Debug, Clone, Default)]
pub struct WorkBatch {
    entries: HashMap<PathBuf, FileEntry>,
}

impl WorkBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, replacing any previous entry for the same local path.
    pub fn insert(&mut self, entry: FileEntry) -> Option<FileEntry> {
        self.entries.insert(entry.local_path.clone(), entry)
    }

    pub fn get(&self, local_path: &Path) -> Option<&FileEntry> {
        self.entries.get(local_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.values()
    }
}

impl IntoIterator for WorkBatch {
    type Item = FileEntry;
    type IntoIter = hash_map::IntoValues<PathBuf, FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

impl FromIterator<FileEntry> for WorkBatch {
    fn from_iter<I: IntoIterator<Item = FileEntry>>(iter: I) -> Self {
        let mut batch = WorkBatch::new();
        for entry in iter {
            batch.insert(entry);
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, key: &str) -> FileEntry {
        FileEntry::new(PathBuf::from(path), key.into(), Vec::new())
    }

    #[test]
    fn batch_keys_are_unique() {
        let mut batch = WorkBatch::new();
        assert!(batch.insert(entry("public/a.html", "a.html")).is_none());
        assert!(batch.insert(entry("public/a.html", "a.html")).is_some());
        assert_eq!(batch.len(), 1);
    }
}
