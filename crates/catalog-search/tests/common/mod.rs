//! Shared helpers for catalog-search integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use catalog_search::{
    Hit, IndexDocument, IndexMapping, IndexOrchestrator, IndexStore, ListPage,
    OrchestratorConfig, QueryDocument, ScrollPage, StoreError, TantivyStore, TantivyStoreConfig,
};
use catalog_types::{Asset, AssetType};

/// In-memory store that records every call.
///
/// Search and list return every document of the resolved indices with
/// score 1.0; queries are recorded, not evaluated.
#[derive(Default)]
pub struct RecordingStore {
    pub calls: Mutex<Vec<String>>,
    pub queries: Mutex<Vec<QueryDocument>>,
    docs: Mutex<HashMap<String, BTreeMap<String, Value>>>,
    scrolls: Mutex<HashMap<String, (Vec<Hit>, usize, usize)>>,
    next_scroll: Mutex<u64>,
    /// Artificial latency applied to every call
    pub delay: Option<Duration>,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Default::default()
        })
    }

    pub fn with_index(self: &Arc<Self>, index: &str) -> Arc<Self> {
        self.docs
            .lock()
            .unwrap()
            .entry(index.to_string())
            .or_default();
        self.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_named(&self, op: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(' ').next() == Some(op))
            .count()
    }

    pub fn open_scrolls(&self) -> usize {
        self.scrolls.lock().unwrap().len()
    }

    async fn record(&self, call: String) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock().unwrap().push(call);
    }

    fn hits(&self, index: &str) -> Vec<Hit> {
        self.docs
            .lock()
            .unwrap()
            .get(index)
            .map(|docs| {
                docs.iter()
                    .map(|(id, source)| Hit {
                        index: index.to_string(),
                        id: id.clone(),
                        score: 1.0,
                        source: source.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn page(&self, scroll_id: &str) -> Result<ScrollPage, StoreError> {
        let mut scrolls = self.scrolls.lock().unwrap();
        let (hits, position, batch) = scrolls
            .get_mut(scroll_id)
            .ok_or_else(|| StoreError::UnknownScroll(scroll_id.to_string()))?;
        let end = (*position + *batch).min(hits.len());
        let page = hits[*position..end].to_vec();
        *position = end;
        Ok(ScrollPage {
            scroll_id: scroll_id.to_string(),
            hits: page,
        })
    }
}

#[async_trait]
impl IndexStore for RecordingStore {
    async fn index_exists(&self, index: &str) -> Result<bool, StoreError> {
        self.record(format!("index_exists {index}")).await;
        Ok(self.docs.lock().unwrap().contains_key(index))
    }

    async fn ensure_index(&self, index: &str, _mapping: &IndexMapping) -> Result<bool, StoreError> {
        self.record(format!("ensure_index {index}")).await;
        let mut docs = self.docs.lock().unwrap();
        if docs.contains_key(index) {
            return Ok(false);
        }
        docs.insert(index.to_string(), BTreeMap::new());
        Ok(true)
    }

    async fn bulk_upsert(&self, index: &str, batch: Vec<IndexDocument>) -> Result<usize, StoreError> {
        self.record(format!("bulk_upsert {index} {}", batch.len())).await;
        let mut docs = self.docs.lock().unwrap();
        let target = docs
            .get_mut(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;
        let written = batch.len();
        for doc in batch {
            target.insert(doc.id, doc.source);
        }
        Ok(written)
    }

    async fn get(&self, index: &str, id: &str) -> Result<Hit, StoreError> {
        self.record(format!("get {index} {id}")).await;
        self.hits(index)
            .into_iter()
            .find(|h| h.id == id)
            .ok_or_else(|| StoreError::NotFound {
                index: index.to_string(),
                id: id.to_string(),
            })
    }

    async fn delete(&self, index: &str, id: &str) -> Result<(), StoreError> {
        self.record(format!("delete {index} {id}")).await;
        let mut docs = self.docs.lock().unwrap();
        match docs.get_mut(index).and_then(|d| d.remove(id)) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                index: index.to_string(),
                id: id.to_string(),
            }),
        }
    }

    async fn count(&self, index: &str) -> Result<u64, StoreError> {
        self.record(format!("count {index}")).await;
        self.docs
            .lock()
            .unwrap()
            .get(index)
            .map(|d| d.len() as u64)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))
    }

    async fn search(
        &self,
        indices: &[String],
        query: &QueryDocument,
        limit: usize,
    ) -> Result<Vec<Hit>, StoreError> {
        self.record(format!("search {} {limit}", indices.join(","))).await;
        self.queries.lock().unwrap().push(query.clone());
        let mut hits: Vec<Hit> = indices.iter().flat_map(|i| self.hits(i)).collect();
        hits.truncate(limit);
        Ok(hits)
    }

    async fn list(
        &self,
        index: &str,
        query: &QueryDocument,
        from: usize,
        size: usize,
    ) -> Result<ListPage, StoreError> {
        self.record(format!("list {index} {from} {size}")).await;
        self.queries.lock().unwrap().push(query.clone());
        if !self.docs.lock().unwrap().contains_key(index) {
            return Err(StoreError::IndexNotFound(index.to_string()));
        }
        let hits = self.hits(index);
        Ok(ListPage {
            total: hits.len() as u64,
            hits: hits.into_iter().skip(from).take(size).collect(),
        })
    }

    async fn scroll_open(
        &self,
        indices: &[String],
        query: &QueryDocument,
        batch_size: usize,
    ) -> Result<ScrollPage, StoreError> {
        self.record(format!("scroll_open {} {batch_size}", indices.join(","))).await;
        self.queries.lock().unwrap().push(query.clone());
        let hits: Vec<Hit> = indices.iter().flat_map(|i| self.hits(i)).collect();
        let scroll_id = {
            let mut next = self.next_scroll.lock().unwrap();
            *next += 1;
            format!("scroll-{next}")
        };
        self.scrolls
            .lock()
            .unwrap()
            .insert(scroll_id.clone(), (hits, 0, batch_size));
        self.page(&scroll_id)
    }

    async fn scroll_next(&self, scroll_id: &str) -> Result<ScrollPage, StoreError> {
        self.record(format!("scroll_next {scroll_id}")).await;
        self.page(scroll_id)
    }

    async fn scroll_close(&self, scroll_id: &str) -> Result<(), StoreError> {
        self.record(format!("scroll_close {scroll_id}")).await;
        match self.scrolls.lock().unwrap().remove(scroll_id) {
            Some(_) => Ok(()),
            None => Err(StoreError::UnknownScroll(scroll_id.to_string())),
        }
    }
}

/// Orchestrator over a Tantivy store in a temp dir.
pub struct TantivyHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: TempDir,
    pub store: TantivyStore,
    pub orchestrator: IndexOrchestrator,
}

impl TantivyHarness {
    pub async fn new(config: OrchestratorConfig) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let store =
            TantivyStore::open(TantivyStoreConfig::new(temp_dir.path()).with_memory_mb(15)).unwrap();
        let orchestrator = IndexOrchestrator::new(Arc::new(store.clone()), config);
        orchestrator.migrate().await.unwrap();
        Self {
            _temp_dir: temp_dir,
            store,
            orchestrator,
        }
    }
}

pub fn asset(ty: AssetType, urn: &str, name: &str, service: &str) -> Asset {
    Asset::new(urn, ty, service, name)
}

pub fn topic(urn: &str, name: &str) -> Asset {
    asset(AssetType::Topic, urn, name, "kafka")
}

pub fn with_country(asset: Asset, country: &str) -> Asset {
    asset.with_data(json!({"country": country}))
}
