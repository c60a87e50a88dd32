//! Document store backed by a directory of JSON files.
//!
//! Partition `<name>` is the file `<name>.json`, holding a JSON array of objects.

use crate::error::VizzError;
use crate::metrics;
use crate::store::{DocumentStore, Record};

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::Instrument;

const EXTENSION: &str = "json";

/// JSON directory document store.
#[derive(Clone, Debug)]
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    /// Create a store reading partitions from `root`.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Returns the file holding a partition, or `None` if the name cannot be a partition.
    ///
    /// Names that would escape the root directory are rejected.
    fn partition_path(&self, partition: &str) -> Option<PathBuf> {
        if partition.is_empty()
            || partition.contains(|c: char| c == '/' || c == '\\')
            || partition == "."
            || partition == ".."
        {
            return None;
        }
        Some(self.root.join(format!("{partition}.{EXTENSION}")))
    }
}

#[async_trait]
impl DocumentStore for JsonDirStore {
    async fn list_partitions(&self) -> Result<Vec<String>, VizzError> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut partitions = vec![];
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                partitions.push(stem.to_string());
            }
        }
        Ok(partitions)
    }

    async fn find_all(&self, partition: &str) -> Result<Vec<Record>, VizzError> {
        let Some(path) = self.partition_path(partition) else {
            return Ok(vec![]);
        };
        let span = tracing::debug_span!("json_dir_find_all", partition);
        let contents = match tokio::fs::read(&path).instrument(span).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(err) => return Err(err.into()),
        };
        let records: Vec<Record> = serde_json::from_slice(&contents)?;
        metrics::count_documents_read(partition, records.len());
        Ok(records)
    }
}
