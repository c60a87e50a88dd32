//! In-memory document store.

use crate::error::VizzError;
use crate::store::{DocumentStore, Record};

use async_trait::async_trait;
use std::collections::BTreeMap;

/// A document store holding its partitions in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    partitions: BTreeMap<String, Vec<Record>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a partition.
    pub fn with_partition(mut self, name: &str, records: Vec<Record>) -> Self {
        self.partitions.insert(name.to_string(), records);
        self
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_partitions(&self) -> Result<Vec<String>, VizzError> {
        Ok(self.partitions.keys().cloned().collect())
    }

    async fn find_all(&self, partition: &str) -> Result<Vec<Record>, VizzError> {
        Ok(self.partitions.get(partition).cloned().unwrap_or_default())
    }
}
