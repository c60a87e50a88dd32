//! Document store backed by an embedded sled database.
//!
//! Each partition is a sled tree. Each value in a tree is one JSON-encoded record; records are
//! read in key order.

use crate::error::VizzError;
use crate::metrics;
use crate::store::{self, DocumentStore, Record};

use async_trait::async_trait;
use std::path::Path;
use tracing::Instrument;

/// Name of the tree sled creates in every database. It never holds records.
const DEFAULT_TREE: &[u8] = b"__sled__default";

/// Sled document store.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open the database at `path`.
    pub fn open(path: &Path) -> Result<Self, VizzError> {
        Ok(Self::from_db(sled::open(path)?))
    }

    /// Wrap an already opened database.
    pub fn from_db(db: sled::Db) -> Self {
        Self { db }
    }

    /// Returns whether a partition exists, without creating it.
    fn has_partition(db: &sled::Db, partition: &str) -> bool {
        db.tree_names()
            .iter()
            .any(|name| &name[..] == partition.as_bytes())
    }

    /// Run a blocking read against a partition's tree on the blocking thread pool.
    ///
    /// Absent partitions yield `T::default()`.
    async fn with_tree<T, F>(&self, partition: &str, f: F) -> Result<T, VizzError>
    where
        T: Default + Send + 'static,
        F: FnOnce(sled::Tree) -> Result<T, VizzError> + Send + 'static,
    {
        let db = self.db.clone();
        let partition = partition.to_string();
        tokio::task::spawn_blocking(move || {
            if !Self::has_partition(&db, &partition) {
                return Ok(T::default());
            }
            f(db.open_tree(partition.as_bytes())?)
        })
        .instrument(tracing::Span::current())
        .await?
    }
}

fn decode(value: &[u8]) -> Result<Record, VizzError> {
    Ok(serde_json::from_slice(value)?)
}

#[async_trait]
impl DocumentStore for SledStore {
    async fn list_partitions(&self) -> Result<Vec<String>, VizzError> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let names: Vec<String> = db
                .tree_names()
                .into_iter()
                .filter(|name| &name[..] != DEFAULT_TREE)
                .map(|name| String::from_utf8_lossy(&name).into_owned())
                .collect();
            Ok::<_, VizzError>(names)
        })
        .await?
    }

    async fn find_all(&self, partition: &str) -> Result<Vec<Record>, VizzError> {
        let span = tracing::debug_span!("sled_find_all", partition);
        let records = self
            .with_tree(partition, |tree| {
                tree.iter()
                    .values()
                    .map(|value| decode(&value?))
                    .collect::<Result<Vec<_>, _>>()
            })
            .instrument(span)
            .await?;
        metrics::count_documents_read(partition, records.len());
        Ok(records)
    }

    async fn find_one(&self, partition: &str) -> Result<Option<Record>, VizzError> {
        let span = tracing::debug_span!("sled_find_one", partition);
        let record = self
            .with_tree(partition, |tree| match tree.first()? {
                Some((_, value)) => decode(&value).map(Some),
                None => Ok(None),
            })
            .instrument(span)
            .await?;
        metrics::count_documents_read(partition, usize::from(record.is_some()));
        Ok(record)
    }

    async fn find_matching(
        &self,
        partition: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Record>, VizzError> {
        let span = tracing::debug_span!("sled_find_matching", partition, field, value);
        let field = field.to_string();
        let value = value.to_string();
        let records = self
            .with_tree(partition, move |tree| {
                let mut records = vec![];
                for item in tree.iter().values() {
                    let record = decode(&item?)?;
                    if store::matches(&record, &field, &value) {
                        records.push(record);
                    }
                }
                Ok(records)
            })
            .instrument(span)
            .await?;
        metrics::count_documents_read(partition, records.len());
        Ok(records)
    }
}
