//! # catalog-search
//!
//! Search side of the catalog.
//!
//! - `builder`: ranked search and scan query construction, whitelist resolution
//! - `store`: the [`IndexStore`] contract the orchestrator depends on
//! - `tantivy_store`: embedded Tantivy implementation of that contract
//! - `orchestrator`: migration, bulk upsert, lookups, ranked search, name
//!   suggestions, offset pages, scans
//! - `cursor`: the lazy scan cursor handed out by the orchestrator

pub mod builder;
pub mod compile;
pub mod cursor;
pub mod document;
pub mod error;
pub mod mapping;
pub mod orchestrator;
pub mod query;
pub mod schema;
pub mod store;
pub mod tantivy_store;
pub mod tokenizer;

pub use builder::{
    build_scan_query, build_search_query, build_suggest_query, resolve_indices,
    DEFAULT_MAX_RESULTS, DEFAULT_SUGGESTIONS, MIN_SCORE,
};
pub use cursor::{CursorState, ScanCursor};
pub use document::IndexDocument;
pub use error::{SearchError, StoreError};
pub use mapping::{IndexMapping, DEFAULT_ALIAS};
pub use orchestrator::{
    AssetPage, IndexOrchestrator, MigrationReport, OrchestratorConfig, PageRequest, SearchResult,
    DEFAULT_PAGE_SIZE,
};
pub use query::{Query, QueryDocument, RecordFilter, SearchRequest};
pub use store::{Hit, IndexStore, ListPage, ScrollPage};
pub use tantivy_store::{TantivyStore, TantivyStoreConfig};
pub use tokenizer::{build_catalog_analyzer, CamelCaseTokenizer};
