use crate::error::VizzError;
use crate::store::DocumentStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use validator::Validate;

/// Trait for query service operations.
///
/// This forms the contract between the API layer and operations. Each operation reads from a
/// [DocumentStore] and produces a JSON-serialisable result.
#[async_trait]
pub trait Query: 'static {
    /// Operation name, used in logs.
    const NAME: &'static str;

    /// Query parameters of the operation.
    type Params: DeserializeOwned + Validate + std::fmt::Debug + Send + Sync;

    /// Result of the operation.
    type Output: Serialize + Send;

    /// Execute the operation.
    ///
    /// # Arguments
    ///
    /// * `store`: Document store to read from
    /// * `params`: Validated query parameters
    async fn execute(
        store: &dyn DocumentStore,
        params: &Self::Params,
    ) -> Result<Self::Output, VizzError>;
}
