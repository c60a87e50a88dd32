//! Read-only document store abstraction.
//!
//! A store holds named partitions, one per year, each containing a sequence of records. Absent
//! partitions read as empty.

use crate::cli::{CommandLineArgs, StoreKind};
use crate::error::VizzError;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub mod json_dir_store;
pub mod memory_store;
pub mod sled_store;

/// A single document: field name to value, in stored field order.
pub type Record = serde_json::Map<String, Value>;

/// Read capabilities required of a document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the names of all partitions, in no particular order.
    async fn list_partitions(&self) -> Result<Vec<String>, VizzError>;

    /// Returns every record in a partition, in stored order.
    async fn find_all(&self, partition: &str) -> Result<Vec<Record>, VizzError>;

    /// Returns the first record in a partition, if any.
    async fn find_one(&self, partition: &str) -> Result<Option<Record>, VizzError> {
        Ok(self.find_all(partition).await?.into_iter().next())
    }

    /// Returns the records in a partition whose `field` is exactly `value`.
    async fn find_matching(
        &self,
        partition: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Record>, VizzError> {
        let records = self.find_all(partition).await?;
        Ok(records
            .into_iter()
            .filter(|record| matches(record, field, value))
            .collect())
    }
}

/// Returns whether a record's `field` holds exactly `value`.
///
/// Numeric fields match their text rendering.
pub fn matches(record: &Record, field: &str, value: &str) -> bool {
    match record.get(field) {
        Some(Value::String(s)) => s == value,
        Some(Value::Number(n)) => n.to_string() == value,
        _ => false,
    }
}

/// Open the store selected on the command line.
///
/// # Arguments
///
/// * `args`: Command line arguments
pub fn open(args: &CommandLineArgs) -> Result<Arc<dyn DocumentStore>, VizzError> {
    let path = args.store_path()?;
    let store: Arc<dyn DocumentStore> = match args.store {
        StoreKind::Sled => Arc::new(sled_store::SledStore::open(&path)?),
        StoreKind::JsonDir => Arc::new(json_dir_store::JsonDirStore::new(&path)),
    };
    tracing::info!("Opened {} document store at {}", args.store, path.display());
    Ok(store)
}
