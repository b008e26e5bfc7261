//! Search and index store error types.

use thiserror::Error;

use catalog_types::{CatalogError, ErrorKind};

/// Errors raised by an [`IndexStore`](crate::store::IndexStore) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Document id absent from the index
    #[error("Document not found: {index}/{id}")]
    NotFound { index: String, id: String },

    /// Index has not been created
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// Tantivy index error
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Scroll id unknown, closed or expired
    #[error("Unknown scroll: {0}")]
    UnknownScroll(String),

    /// Query document uses a construct the store cannot evaluate
    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),

    /// On-disk index schema differs from the catalog schema
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Unsupported analyzer: {0}")]
    UnsupportedAnalyzer(String),

    /// Document rejected before any write
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Index writer mutex poisoned
    #[error("Index is locked: {0}")]
    IndexLocked(String),

    /// Caller stopped waiting; pending writes were rolled back
    #[error("Store call cancelled: {0}")]
    Cancelled(&'static str),

    /// Blocking task failed to complete
    #[error("Internal store error: {0}")]
    Internal(String),
}

/// Errors surfaced by the query builder and index orchestrator.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search text must not be empty")]
    EmptySearchText,

    #[error("Asset not found: {index}/{id}")]
    NotFound { index: String, id: String },

    /// Bulk batch carried a record without a urn; nothing was written
    #[error("Empty urn in batch for index {index}")]
    EmptyUrn { index: String },

    #[error("Index store {op} on {index} failed: {source}")]
    Store {
        op: &'static str,
        index: String,
        #[source]
        source: StoreError,
    },

    #[error("Index store {op} on {index} timed out")]
    Timeout { op: &'static str, index: String },

    /// Asset JSON could not be encoded for, or decoded from, the store
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl SearchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SearchError::EmptySearchText | SearchError::EmptyUrn { .. } => ErrorKind::Validation,
            SearchError::NotFound { .. } => ErrorKind::NotFound,
            SearchError::Store { .. }
            | SearchError::Timeout { .. }
            | SearchError::Serialization(_) => ErrorKind::StoreFailure,
            SearchError::Catalog(e) => e.kind(),
        }
    }

    /// Wrap a store error with the failing operation and index.
    ///
    /// A missing document keeps its distinguished not-found identity.
    pub(crate) fn store(op: &'static str, index: impl Into<String>, source: StoreError) -> Self {
        match source {
            StoreError::NotFound { index, id } => SearchError::NotFound { index, id },
            source => SearchError::Store {
                op,
                index: index.into(),
                source,
            },
        }
    }
}
