//! Index store contract.
//!
//! The orchestrator talks to the full-text engine only through
//! [`IndexStore`]. [`TantivyStore`](crate::tantivy_store::TantivyStore) is the
//! embedded implementation.

use async_trait::async_trait;
use serde_json::Value;

use crate::document::IndexDocument;
use crate::error::StoreError;
use crate::mapping::IndexMapping;
use crate::query::QueryDocument;

/// One document returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    /// Concrete index the document was found in
    pub index: String,
    pub id: String,
    pub score: f32,
    pub source: Value,
}

/// One batch of a scroll.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollPage {
    pub scroll_id: String,
    /// Empty once the scroll is drained
    pub hits: Vec<Hit>,
}

/// One slice of an ordered listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage {
    pub hits: Vec<Hit>,
    /// Matching documents across all pages
    pub total: u64,
}

#[async_trait]
pub trait IndexStore: Send + Sync {
    async fn index_exists(&self, index: &str) -> Result<bool, StoreError>;

    /// Create `index` with `mapping` unless it exists. Returns whether it was created.
    async fn ensure_index(&self, index: &str, mapping: &IndexMapping) -> Result<bool, StoreError>;

    /// Index-or-replace every document by id and make the batch visible
    /// before returning. A batch is written entirely or not at all.
    async fn bulk_upsert(&self, index: &str, docs: Vec<IndexDocument>)
        -> Result<usize, StoreError>;

    async fn get(&self, index: &str, id: &str) -> Result<Hit, StoreError>;

    async fn delete(&self, index: &str, id: &str) -> Result<(), StoreError>;

    async fn count(&self, index: &str) -> Result<u64, StoreError>;

    /// Ranked search. `indices` may name aliases; unknown names are skipped.
    async fn search(
        &self,
        indices: &[String],
        query: &QueryDocument,
        limit: usize,
    ) -> Result<Vec<Hit>, StoreError>;

    /// Matching documents of `index` ordered by id, skipping `from` and
    /// returning at most `size`.
    async fn list(
        &self,
        index: &str,
        query: &QueryDocument,
        from: usize,
        size: usize,
    ) -> Result<ListPage, StoreError>;

    async fn scroll_open(
        &self,
        indices: &[String],
        query: &QueryDocument,
        batch_size: usize,
    ) -> Result<ScrollPage, StoreError>;

    async fn scroll_next(&self, scroll_id: &str) -> Result<ScrollPage, StoreError>;

    async fn scroll_close(&self, scroll_id: &str) -> Result<(), StoreError>;
}
