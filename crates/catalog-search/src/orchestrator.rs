//! Index orchestrator: index lifecycle, ingestion, lookups and scans.
//!
//! Every call into the [`IndexStore`] is bounded by the configured request
//! timeout. Store failures come back wrapped with the operation and index
//! they belong to; a missing document stays a distinguished not-found.

use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use catalog_types::{Asset, AssetType, CatalogError, Settings};

use crate::builder::{
    build_scan_query, build_search_query, build_suggest_query, resolve_indices,
    DEFAULT_MAX_RESULTS, DEFAULT_SUGGESTIONS, SUGGEST_FIELD,
};
use crate::cursor::ScanCursor;
use crate::document::IndexDocument;
use crate::error::{SearchError, StoreError};
use crate::mapping::IndexMapping;
use crate::query::{RecordFilter, SearchRequest};
use crate::store::IndexStore;

/// Batch size for full scans.
pub const DEFAULT_SCROLL_BATCH_SIZE: usize = 1000;

/// Page size of a listing that asks for none.
pub const DEFAULT_PAGE_SIZE: usize = 20;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Global type whitelist; empty means every registered type
    pub type_whitelist: Vec<AssetType>,
    pub default_max_results: usize,
    pub scroll_batch_size: usize,
    pub request_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            type_whitelist: Vec::new(),
            default_max_results: DEFAULT_MAX_RESULTS,
            scroll_batch_size: DEFAULT_SCROLL_BATCH_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl OrchestratorConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self, CatalogError> {
        Ok(Self {
            type_whitelist: settings.whitelist()?,
            default_max_results: settings.max_results,
            scroll_batch_size: settings.scroll_batch_size,
            request_timeout: settings.request_timeout(),
        })
    }

    pub fn with_whitelist(mut self, types: Vec<AssetType>) -> Self {
        self.type_whitelist = types;
        self
    }

    pub fn with_scroll_batch_size(mut self, size: usize) -> Self {
        self.scroll_batch_size = size;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Outcome of a migration run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub created: Vec<AssetType>,
    pub existing: Vec<AssetType>,
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Type whose index the hit was found in
    pub asset_type: AssetType,
    pub score: f32,
    pub asset: Asset,
}

/// Offset page of one type's assets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRequest {
    pub filters: RecordFilter,
    /// Page size; 0 means [`DEFAULT_PAGE_SIZE`]
    pub size: usize,
    /// Assets to skip, in urn order
    pub from: usize,
}

impl PageRequest {
    pub fn new(from: usize, size: usize) -> Self {
        Self {
            filters: RecordFilter::new(),
            size,
            from,
        }
    }

    pub fn with_filters(mut self, filters: RecordFilter) -> Self {
        self.filters = filters;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetPage {
    pub assets: Vec<Asset>,
    /// Matching assets across all pages
    pub total: u64,
}

/// Await a store call under `timeout`, attaching operation context on failure.
pub(crate) async fn bounded<T, F>(
    timeout: Duration,
    op: &'static str,
    index: &str,
    call: F,
) -> Result<T, SearchError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(|e| SearchError::store(op, index, e)),
        Err(_) => {
            warn!(op, index, timeout_ms = timeout.as_millis() as u64, "Index store call timed out");
            Err(SearchError::Timeout {
                op,
                index: index.to_string(),
            })
        }
    }
}

pub struct IndexOrchestrator {
    store: Arc<dyn IndexStore>,
    config: OrchestratorConfig,
}

impl IndexOrchestrator {
    pub fn new(store: Arc<dyn IndexStore>, config: OrchestratorConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    async fn call<T, F>(&self, op: &'static str, index: &str, call: F) -> Result<T, SearchError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        bounded(self.config.request_timeout, op, index, call).await
    }

    /// Create the backing index of every registered type that lacks one.
    ///
    /// Re-running on a migrated catalog changes nothing.
    pub async fn migrate(&self) -> Result<MigrationReport, SearchError> {
        let mapping = IndexMapping::catalog();
        let mut report = MigrationReport::default();

        for ty in AssetType::ALL {
            let index = ty.index_name();
            let exists = self
                .call("index_exists", index, self.store.index_exists(index))
                .await?;
            if exists {
                debug!(index, "Index already migrated");
                report.existing.push(ty);
                continue;
            }
            let created = self
                .call("ensure_index", index, self.store.ensure_index(index, &mapping))
                .await?;
            if created {
                report.created.push(ty);
            } else {
                report.existing.push(ty);
            }
        }

        info!(
            created = report.created.len(),
            existing = report.existing.len(),
            "Migration complete"
        );
        Ok(report)
    }

    /// Index or replace `assets` in the index of `ty`, keyed by urn.
    ///
    /// A single asset without a urn rejects the whole batch before any write.
    pub async fn create_or_replace_many(
        &self,
        ty: AssetType,
        assets: &[Asset],
    ) -> Result<usize, SearchError> {
        let index = ty.index_name();
        if assets.iter().any(|a| !a.has_urn()) {
            return Err(SearchError::EmptyUrn {
                index: index.to_string(),
            });
        }
        if assets.is_empty() {
            return Ok(0);
        }

        let docs = assets
            .iter()
            .map(|a| Ok(IndexDocument::new(a.urn.clone(), serde_json::to_value(a)?)))
            .collect::<Result<Vec<_>, serde_json::Error>>()?;

        let written = self
            .call("bulk_upsert", index, self.store.bulk_upsert(index, docs))
            .await?;
        debug!(index, written, "Bulk upsert complete");
        Ok(written)
    }

    pub async fn get_by_id(&self, ty: AssetType, id: &str) -> Result<Asset, SearchError> {
        let index = ty.index_name();
        let hit = self.call("get", index, self.store.get(index, id)).await?;
        Ok(serde_json::from_value(hit.source)?)
    }

    pub async fn delete(&self, ty: AssetType, id: &str) -> Result<(), SearchError> {
        let index = ty.index_name();
        self.call("delete", index, self.store.delete(index, id)).await?;
        info!(index, id, "Deleted asset from index");
        Ok(())
    }

    /// Ranked search across the whitelisted type indices.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, SearchError> {
        let query = build_search_query(request)?;

        let types = resolve_indices(&self.config.type_whitelist, &request.type_whitelist);
        if types.is_empty() {
            debug!("Type whitelists do not intersect, nothing to search");
            return Ok(Vec::new());
        }
        let indices: Vec<String> = types.iter().map(|t| t.index_name().to_string()).collect();
        let limit = match request.max_results {
            0 => self.config.default_max_results,
            n => n,
        };

        let label = indices.join(",");
        let hits = self
            .call("search", &label, self.store.search(&indices, &query, limit))
            .await?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let Some(asset_type) = AssetType::parse(&hit.index) else {
                warn!(index = %hit.index, id = %hit.id, "Hit from an index outside the registry");
                continue;
            };
            results.push(SearchResult {
                asset_type,
                score: hit.score,
                asset: serde_json::from_value(hit.source)?,
            });
        }
        debug!(text = %request.text, results = results.len(), "Search complete");
        Ok(results)
    }

    /// Complete `request.text` against asset names in the whitelisted types.
    ///
    /// Filters and field queries are ignored. Names come back best match
    /// first, ties in name order, without duplicates.
    pub async fn suggest(&self, request: &SearchRequest) -> Result<Vec<String>, SearchError> {
        let query = build_suggest_query(&request.text)?;

        let types = resolve_indices(&self.config.type_whitelist, &request.type_whitelist);
        if types.is_empty() {
            debug!("Type whitelists do not intersect, nothing to suggest");
            return Ok(Vec::new());
        }
        let indices: Vec<String> = types.iter().map(|t| t.index_name().to_string()).collect();
        let max = match request.max_results {
            0 => DEFAULT_SUGGESTIONS,
            n => n,
        };

        let label = indices.join(",");
        let limit = self.config.default_max_results.max(max);
        let hits = self
            .call("suggest", &label, self.store.search(&indices, &query, limit))
            .await?;

        let mut candidates: Vec<(f32, String)> = hits
            .into_iter()
            .filter_map(|hit| {
                let name = hit.source.get(SUGGEST_FIELD)?.as_str()?;
                (!name.is_empty()).then(|| (hit.score, name.to_string()))
            })
            .collect();
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        let mut seen = HashSet::new();
        let suggestions: Vec<String> = candidates
            .into_iter()
            .map(|(_, name)| name)
            .filter(|name| seen.insert(name.clone()))
            .take(max)
            .collect();
        debug!(text = %request.text, suggestions = suggestions.len(), "Suggest complete");
        Ok(suggestions)
    }

    /// One offset page of the assets of `ty`, in urn order.
    pub async fn get_page(
        &self,
        ty: AssetType,
        request: &PageRequest,
    ) -> Result<AssetPage, SearchError> {
        let index = ty.index_name();
        let query = build_scan_query(&request.filters);
        let size = match request.size {
            0 => DEFAULT_PAGE_SIZE,
            n => n,
        };
        let page = self
            .call("list", index, self.store.list(index, &query, request.from, size))
            .await?;
        let assets = page
            .hits
            .into_iter()
            .map(|hit| serde_json::from_value(hit.source))
            .collect::<Result<Vec<Asset>, _>>()?;
        debug!(index, from = request.from, count = assets.len(), total = page.total, "Fetched page");
        Ok(AssetPage {
            assets,
            total: page.total,
        })
    }

    /// Open a lazy scan over the index of `ty`.
    ///
    /// The caller owns the cursor and must close it.
    pub async fn get_all_iterator(
        &self,
        ty: AssetType,
        filters: &RecordFilter,
    ) -> Result<ScanCursor, SearchError> {
        let index = ty.index_name();
        let query = build_scan_query(filters);
        let targets = [index.to_string()];
        let page = self
            .call(
                "scroll_open",
                index,
                self.store
                    .scroll_open(&targets, &query, self.config.scroll_batch_size),
            )
            .await?;
        Ok(ScanCursor::new(
            self.store.clone(),
            ty,
            page,
            self.config.request_timeout,
        ))
    }

    /// Drain a full scan into memory.
    pub async fn get_all(
        &self,
        ty: AssetType,
        filters: &RecordFilter,
    ) -> Result<Vec<Asset>, SearchError> {
        let mut cursor = self.get_all_iterator(ty, filters).await?;
        let mut assets = Vec::new();
        let drained = loop {
            if !cursor.has_more() {
                break Ok(());
            }
            match cursor.next().await {
                Ok(batch) => assets.extend(batch),
                Err(e) => break Err(e),
            }
        };
        let closed = cursor.close().await;
        drained?;
        closed?;
        debug!(index = ty.index_name(), count = assets.len(), "Full scan complete");
        Ok(assets)
    }

    /// Document count per whitelisted type; types without an index are omitted.
    pub async fn type_counts(&self) -> Result<BTreeMap<AssetType, u64>, SearchError> {
        let types = resolve_indices(&self.config.type_whitelist, &[]);
        let counts = join_all(types.iter().map(|ty| {
            let index = ty.index_name();
            self.call("count", index, self.store.count(index))
        }))
        .await;

        let mut out = BTreeMap::new();
        for (ty, count) in types.into_iter().zip(counts) {
            match count {
                Ok(n) => {
                    out.insert(ty, n);
                }
                Err(SearchError::Store {
                    source: StoreError::IndexNotFound(_),
                    ..
                }) => debug!(index = ty.index_name(), "Skipping unmigrated type"),
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }
}
