use crate::cli::CommandLineArgs;
use crate::error::VizzError;
use crate::store::{self, DocumentStore};

use std::sync::Arc;

/// Shared application state passed to each query request handler.
pub struct AppState {
    /// Document store.
    pub store: Arc<dyn DocumentStore>,
}

impl AppState {
    /// Create and return an [AppState], opening the store selected on the command line.
    pub fn new(args: &CommandLineArgs) -> Result<Self, VizzError> {
        Ok(Self::with_store(store::open(args)?))
    }

    /// Create and return an [AppState] around an existing store.
    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

/// AppState wrapped in an Atomic Reference Count (Arc) to allow multiple references.
pub type SharedAppState = Arc<AppState>;
