//! Embedded index store on Tantivy.
//!
//! Layout: one Tantivy index per index name under `<root>/<name>/`, next to
//! the `mapping.json` it was created with. Writers and readers stay open for
//! the life of the store. Every write commits and reloads the reader before
//! returning, so a write is visible to the next read.
//!
//! All Tantivy work runs on the blocking pool. A caller that stops waiting
//! (a timeout dropping the future) cancels the call: writes not yet committed
//! are rolled back and a scroll not yet registered is discarded.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tantivy::collector::{Count, DocSetCollector, TopDocs};
use tantivy::query::{Query as TantivyQuery, TermQuery};
use tantivy::schema::{IndexRecordOption, Value as _};
use tantivy::{
    DocAddress, Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term,
};
use tracing::{debug, info, warn};
use ulid::Ulid;

use catalog_types::Settings;

use crate::compile::compile;
use crate::document::{to_tantivy_doc, IndexDocument};
use crate::error::StoreError;
use crate::mapping::IndexMapping;
use crate::query::QueryDocument;
use crate::schema::{build_catalog_schema, CatalogSchema};
use crate::store::{Hit, IndexStore, ListPage, ScrollPage};
use crate::tokenizer::{build_catalog_analyzer, CATALOG_TOKENIZER};

const MAPPING_FILE: &str = "mapping.json";

/// Smallest writer budget Tantivy accepts for one indexing thread.
const MIN_WRITER_MEMORY_BYTES: usize = 15 * 1024 * 1024;

/// Tantivy store configuration
#[derive(Debug, Clone)]
pub struct TantivyStoreConfig {
    /// Root directory holding one subdirectory per index
    pub root: PathBuf,
    /// Memory budget for each index writer in MB
    pub writer_memory_mb: usize,
    /// Idle lifetime of an open scroll
    pub scroll_keep_alive: Duration,
}

impl TantivyStoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            writer_memory_mb: 50,
            scroll_keep_alive: Duration::from_secs(30),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            root: settings.expanded_index_path(),
            writer_memory_mb: settings.writer_memory_mb,
            scroll_keep_alive: settings.scroll_keep_alive(),
        }
    }

    pub fn with_memory_mb(mut self, mb: usize) -> Self {
        self.writer_memory_mb = mb;
        self
    }

    pub fn with_scroll_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.scroll_keep_alive = keep_alive;
        self
    }

    fn writer_budget(&self) -> usize {
        (self.writer_memory_mb * 1024 * 1024).max(MIN_WRITER_MEMORY_BYTES)
    }
}

/// One open index with its writer and reader.
struct TypeIndex {
    name: String,
    schema: CatalogSchema,
    writer: Mutex<IndexWriter>,
    reader: IndexReader,
    mapping: IndexMapping,
}

impl TypeIndex {
    fn open(dir: &Path, name: &str, config: &TantivyStoreConfig) -> Result<Self, StoreError> {
        let mapping: IndexMapping = serde_json::from_slice(&std::fs::read(dir.join(MAPPING_FILE))?)?;
        let index = Index::open_in_dir(dir)?;
        Self::from_index(index, name, mapping, config)
    }

    fn create(
        dir: &Path,
        name: &str,
        mapping: &IndexMapping,
        config: &TantivyStoreConfig,
    ) -> Result<Self, StoreError> {
        // A directory without a mapping is left over from an interrupted create.
        if dir.exists() {
            std::fs::remove_dir_all(dir)?;
        }
        std::fs::create_dir_all(dir)?;
        let schema = build_catalog_schema();
        let index = Index::create_in_dir(dir, schema.schema().clone())?;
        std::fs::write(dir.join(MAPPING_FILE), serde_json::to_vec_pretty(mapping)?)?;
        Self::from_index(index, name, mapping.clone(), config)
    }

    fn from_index(
        index: Index,
        name: &str,
        mapping: IndexMapping,
        config: &TantivyStoreConfig,
    ) -> Result<Self, StoreError> {
        index
            .tokenizers()
            .register(CATALOG_TOKENIZER, build_catalog_analyzer());
        let schema = CatalogSchema::from_schema(index.schema())?;
        let writer = index.writer_with_num_threads(1, config.writer_budget())?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        Ok(Self {
            name: name.to_string(),
            schema,
            writer: Mutex::new(writer),
            reader,
            mapping,
        })
    }

    fn id_query(&self, id: &str) -> TermQuery {
        TermQuery::new(
            Term::from_field_text(self.schema.id, id),
            IndexRecordOption::Basic,
        )
    }

    fn load_hit(&self, searcher: &Searcher, address: DocAddress, score: f32) -> Result<Hit, StoreError> {
        let doc: TantivyDocument = searcher.doc(address)?;
        let id = doc
            .get_first(self.schema.id)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let raw = doc
            .get_first(self.schema.source)
            .and_then(|v| v.as_str())
            .ok_or_else(|| StoreError::Internal(format!("document {id} has no stored source")))?;
        Ok(Hit {
            index: self.name.clone(),
            id,
            score,
            source: serde_json::from_str(raw)?,
        })
    }

    /// Commit pending writes and make them visible, rolling back on failure.
    fn commit(&self, writer: &mut IndexWriter) -> Result<u64, StoreError> {
        match writer.commit() {
            Ok(opstamp) => {
                self.reader.reload()?;
                Ok(opstamp)
            }
            Err(e) => {
                if let Err(rollback) = writer.rollback() {
                    warn!(index = %self.name, error = %rollback, "Rollback after failed commit failed");
                }
                Err(e.into())
            }
        }
    }
}

/// Cancellation flag shared between an awaiting caller and its blocking task.
#[derive(Debug, Clone, Default)]
struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    fn check(&self, op: &'static str) -> Result<(), StoreError> {
        if self.0.load(Ordering::Acquire) {
            Err(StoreError::Cancelled(op))
        } else {
            Ok(())
        }
    }
}

/// Cancels the call when the awaiting future is dropped before completion.
struct CancelOnDrop {
    cancellation: Cancellation,
    armed: bool,
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.cancellation.cancel();
        }
    }
}

/// Roll back uncommitted writes unless the call is still wanted.
fn check_or_rollback(
    cancel: &Cancellation,
    op: &'static str,
    index: &str,
    writer: &mut IndexWriter,
) -> Result<(), StoreError> {
    if let Err(e) = cancel.check(op) {
        match writer.rollback() {
            Ok(_) => warn!(index, op, "Caller gave up, rolled back pending writes"),
            Err(rollback) => warn!(index, op, error = %rollback, "Rollback after cancel failed"),
        }
        return Err(e);
    }
    Ok(())
}

/// Scroll session pinned to the searchers it was opened with.
struct ScrollState {
    targets: Vec<(Arc<TypeIndex>, Searcher)>,
    /// Target slot, address and score, in delivery order
    docs: Vec<(usize, DocAddress, f32)>,
    position: usize,
    batch_size: usize,
    last_access: Instant,
}

impl ScrollState {
    fn next_page(&mut self) -> Result<Vec<Hit>, StoreError> {
        self.last_access = Instant::now();
        let end = (self.position + self.batch_size).min(self.docs.len());
        let mut hits = Vec::with_capacity(end - self.position);
        for &(slot, address, score) in &self.docs[self.position..end] {
            let (target, searcher) = &self.targets[slot];
            hits.push(target.load_hit(searcher, address, score)?);
        }
        self.position = end;
        Ok(hits)
    }
}

struct Inner {
    config: TantivyStoreConfig,
    indices: RwLock<HashMap<String, Arc<TypeIndex>>>,
    scrolls: Mutex<HashMap<String, ScrollState>>,
}

impl Inner {
    fn index(&self, name: &str) -> Result<Arc<TypeIndex>, StoreError> {
        let indices = self
            .indices
            .read()
            .map_err(|e| StoreError::IndexLocked(e.to_string()))?;
        indices
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::IndexNotFound(name.to_string()))
    }

    /// Expand index names and aliases into open indices, skipping unknown names.
    fn resolve(&self, targets: &[String]) -> Result<Vec<Arc<TypeIndex>>, StoreError> {
        let indices = self
            .indices
            .read()
            .map_err(|e| StoreError::IndexLocked(e.to_string()))?;
        let mut resolved: Vec<Arc<TypeIndex>> = Vec::new();
        for target in targets {
            let mut matched: Vec<Arc<TypeIndex>> = match indices.get(target) {
                Some(index) => vec![index.clone()],
                None => indices
                    .values()
                    .filter(|i| i.mapping.has_alias(target))
                    .cloned()
                    .collect(),
            };
            if matched.is_empty() {
                debug!(target = %target, "Skipping unavailable index");
            }
            matched.sort_by(|a, b| a.name.cmp(&b.name));
            for index in matched {
                if !resolved.iter().any(|r| r.name == index.name) {
                    resolved.push(index);
                }
            }
        }
        Ok(resolved)
    }

    fn ensure_index(&self, name: &str, mapping: &IndexMapping) -> Result<bool, StoreError> {
        let unsupported = mapping.unsupported_analyzers();
        if !unsupported.is_empty() {
            return Err(StoreError::UnsupportedAnalyzer(unsupported.join(", ")));
        }
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(StoreError::InvalidDocument(format!("invalid index name {name:?}")));
        }

        let mut indices = self
            .indices
            .write()
            .map_err(|e| StoreError::IndexLocked(e.to_string()))?;
        if indices.contains_key(name) {
            return Ok(false);
        }
        let index = TypeIndex::create(&self.config.root.join(name), name, mapping, &self.config)?;
        indices.insert(name.to_string(), Arc::new(index));
        info!(index = name, "Created index");
        Ok(true)
    }

    fn bulk_upsert(
        &self,
        name: &str,
        docs: &[IndexDocument],
        cancel: &Cancellation,
    ) -> Result<usize, StoreError> {
        let index = self.index(name)?;
        if let Some(pos) = docs.iter().position(|d| d.id.is_empty()) {
            return Err(StoreError::InvalidDocument(format!(
                "document at position {pos} has an empty id"
            )));
        }
        let prepared = docs
            .iter()
            .map(|d| to_tantivy_doc(&index.schema, d))
            .collect::<Result<Vec<_>, _>>()?;

        let mut writer = index
            .writer
            .lock()
            .map_err(|e| StoreError::IndexLocked(e.to_string()))?;
        check_or_rollback(cancel, "bulk_upsert", name, &mut writer)?;
        for (doc, tantivy_doc) in docs.iter().zip(prepared) {
            writer.delete_term(Term::from_field_text(index.schema.id, &doc.id));
            if let Err(e) = writer.add_document(tantivy_doc) {
                if let Err(rollback) = writer.rollback() {
                    warn!(index = name, error = %rollback, "Rollback after failed add failed");
                }
                return Err(e.into());
            }
        }
        check_or_rollback(cancel, "bulk_upsert", name, &mut writer)?;
        let opstamp = index.commit(&mut writer)?;
        info!(index = name, count = docs.len(), opstamp, "Committed bulk upsert");
        Ok(docs.len())
    }

    fn get(&self, name: &str, id: &str) -> Result<Hit, StoreError> {
        let index = self.index(name)?;
        let searcher = index.reader.searcher();
        let top = searcher.search(&index.id_query(id), &TopDocs::with_limit(1))?;
        match top.first() {
            Some(&(score, address)) => index.load_hit(&searcher, address, score),
            None => Err(StoreError::NotFound {
                index: name.to_string(),
                id: id.to_string(),
            }),
        }
    }

    fn delete(&self, name: &str, id: &str, cancel: &Cancellation) -> Result<(), StoreError> {
        let index = self.index(name)?;
        let mut writer = index
            .writer
            .lock()
            .map_err(|e| StoreError::IndexLocked(e.to_string()))?;
        let present = index.reader.searcher().search(&index.id_query(id), &Count)?;
        if present == 0 {
            return Err(StoreError::NotFound {
                index: name.to_string(),
                id: id.to_string(),
            });
        }
        writer.delete_term(Term::from_field_text(index.schema.id, id));
        check_or_rollback(cancel, "delete", name, &mut writer)?;
        index.commit(&mut writer)?;
        debug!(index = name, id, "Deleted document");
        Ok(())
    }

    fn count(&self, name: &str) -> Result<u64, StoreError> {
        Ok(self.index(name)?.reader.searcher().num_docs())
    }

    fn search(
        &self,
        targets: &[String],
        query: &QueryDocument,
        limit: usize,
    ) -> Result<Vec<Hit>, StoreError> {
        let resolved = self.resolve(targets)?;
        if limit == 0 || resolved.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits = Vec::new();
        for index in &resolved {
            let compiled = compile(&index.schema, &query.query)?;
            let searcher = index.reader.searcher();
            let top = searcher.search(compiled.as_ref(), &TopDocs::with_limit(limit))?;
            for (score, address) in top {
                if query.min_score.is_some_and(|min| f64::from(score) < min) {
                    continue;
                }
                hits.push(index.load_hit(&searcher, address, score)?);
            }
        }
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        debug!(indices = resolved.len(), hits = hits.len(), "Search complete");
        Ok(hits)
    }

    fn matching_docs(
        index: &TypeIndex,
        searcher: &Searcher,
        compiled: &dyn TantivyQuery,
        min_score: Option<f64>,
    ) -> Result<Vec<(DocAddress, f32)>, StoreError> {
        let mut docs: Vec<(DocAddress, f32)> = match min_score {
            None => searcher
                .search(compiled, &DocSetCollector)?
                .into_iter()
                .map(|address| (address, 1.0))
                .collect(),
            Some(min) => {
                let all = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX).max(1);
                searcher
                    .search(compiled, &TopDocs::with_limit(all))?
                    .into_iter()
                    .filter(|(score, _)| f64::from(*score) >= min)
                    .map(|(score, address)| (address, score))
                    .collect()
            }
        };
        docs.sort_by_key(|(address, _)| (address.segment_ord, address.doc_id));
        debug!(index = %index.name, matched = docs.len(), "Collected scroll documents");
        Ok(docs)
    }

    fn list(
        &self,
        name: &str,
        query: &QueryDocument,
        from: usize,
        size: usize,
    ) -> Result<ListPage, StoreError> {
        let index = self.index(name)?;
        let compiled = compile(&index.schema, &query.query)?;
        let searcher = index.reader.searcher();
        let docs = Self::matching_docs(&index, &searcher, compiled.as_ref(), query.min_score)?;
        let total = docs.len() as u64;

        let mut keyed = docs
            .into_iter()
            .map(|(address, score)| {
                let doc: TantivyDocument = searcher.doc(address)?;
                let id = doc
                    .get_first(index.schema.id)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                Ok((id, address, score))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        keyed.sort_by(|a, b| a.0.cmp(&b.0));

        let hits = keyed
            .into_iter()
            .skip(from)
            .take(size)
            .map(|(_, address, score)| index.load_hit(&searcher, address, score))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(index = name, from, returned = hits.len(), total, "Listed documents");
        Ok(ListPage { hits, total })
    }

    fn scroll_open(
        &self,
        targets: &[String],
        query: &QueryDocument,
        batch_size: usize,
        cancel: &Cancellation,
    ) -> Result<ScrollPage, StoreError> {
        self.purge_expired_scrolls()?;
        let resolved = self.resolve(targets)?;

        let mut state = ScrollState {
            targets: Vec::with_capacity(resolved.len()),
            docs: Vec::new(),
            position: 0,
            batch_size: batch_size.max(1),
            last_access: Instant::now(),
        };
        for (slot, index) in resolved.into_iter().enumerate() {
            let compiled = compile(&index.schema, &query.query)?;
            let searcher = index.reader.searcher();
            let docs = Self::matching_docs(&index, &searcher, compiled.as_ref(), query.min_score)?;
            state
                .docs
                .extend(docs.into_iter().map(|(address, score)| (slot, address, score)));
            state.targets.push((index, searcher));
        }

        let hits = state.next_page()?;
        let scroll_id = Ulid::new().to_string();
        let mut scrolls = self
            .scrolls
            .lock()
            .map_err(|e| StoreError::IndexLocked(e.to_string()))?;
        // Nobody would own the scroll id.
        cancel.check("scroll_open")?;
        debug!(scroll_id = %scroll_id, total = state.docs.len(), "Opened scroll");
        scrolls.insert(scroll_id.clone(), state);
        Ok(ScrollPage { scroll_id, hits })
    }

    fn scroll_next(&self, scroll_id: &str) -> Result<ScrollPage, StoreError> {
        self.purge_expired_scrolls()?;
        let mut scrolls = self
            .scrolls
            .lock()
            .map_err(|e| StoreError::IndexLocked(e.to_string()))?;
        let state = scrolls
            .get_mut(scroll_id)
            .ok_or_else(|| StoreError::UnknownScroll(scroll_id.to_string()))?;
        let hits = state.next_page()?;
        Ok(ScrollPage {
            scroll_id: scroll_id.to_string(),
            hits,
        })
    }

    fn scroll_close(&self, scroll_id: &str) -> Result<(), StoreError> {
        let removed = self
            .scrolls
            .lock()
            .map_err(|e| StoreError::IndexLocked(e.to_string()))?
            .remove(scroll_id);
        match removed {
            Some(_) => {
                debug!(scroll_id, "Closed scroll");
                Ok(())
            }
            None => Err(StoreError::UnknownScroll(scroll_id.to_string())),
        }
    }

    fn purge_expired_scrolls(&self) -> Result<(), StoreError> {
        let keep_alive = self.config.scroll_keep_alive;
        let mut scrolls = self
            .scrolls
            .lock()
            .map_err(|e| StoreError::IndexLocked(e.to_string()))?;
        let before = scrolls.len();
        scrolls.retain(|_, s| s.last_access.elapsed() < keep_alive);
        let purged = before - scrolls.len();
        if purged > 0 {
            warn!(purged, "Expired idle scrolls");
        }
        Ok(())
    }

    fn open_scrolls(&self) -> usize {
        self.scrolls.lock().map(|s| s.len()).unwrap_or_default()
    }
}

/// Tantivy-backed [`IndexStore`].
#[derive(Clone)]
pub struct TantivyStore {
    inner: Arc<Inner>,
}

impl TantivyStore {
    /// Open the store at `config.root`, creating the directory if needed and
    /// reopening every index found there.
    pub fn open(config: TantivyStoreConfig) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&config.root)?;

        let mut indices = HashMap::new();
        for entry in std::fs::read_dir(&config.root)? {
            let dir = entry?.path();
            if !dir.join(MAPPING_FILE).is_file() {
                continue;
            }
            let Some(name) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            let index = TypeIndex::open(&dir, &name, &config)?;
            indices.insert(name, Arc::new(index));
        }
        info!(root = ?config.root, indices = indices.len(), "Opened index store");

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                indices: RwLock::new(indices),
                scrolls: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn root(&self) -> &Path {
        &self.inner.config.root
    }

    /// Number of scrolls currently held open.
    pub fn open_scrolls(&self) -> usize {
        self.inner.open_scrolls()
    }

    /// Run `f` on the blocking pool. Dropping the returned future cancels
    /// the call; `f` observes that through the [`Cancellation`] it is given.
    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Inner, &Cancellation) -> Result<T, StoreError> + Send + 'static,
    {
        let inner = self.inner.clone();
        let cancellation = Cancellation::default();
        let mut guard = CancelOnDrop {
            cancellation: cancellation.clone(),
            armed: true,
        };
        let result = tokio::task::spawn_blocking(move || f(&inner, &cancellation))
            .await
            .map_err(|e| StoreError::Internal(format!("store task failed: {e}")));
        guard.armed = false;
        result?
    }
}

#[async_trait]
impl IndexStore for TantivyStore {
    async fn index_exists(&self, index: &str) -> Result<bool, StoreError> {
        match self.inner.index(index) {
            Ok(_) => Ok(true),
            Err(StoreError::IndexNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn ensure_index(&self, index: &str, mapping: &IndexMapping) -> Result<bool, StoreError> {
        let (index, mapping) = (index.to_string(), mapping.clone());
        self.blocking(move |inner, _| inner.ensure_index(&index, &mapping))
            .await
    }

    async fn bulk_upsert(
        &self,
        index: &str,
        docs: Vec<IndexDocument>,
    ) -> Result<usize, StoreError> {
        let index = index.to_string();
        self.blocking(move |inner, cancel| inner.bulk_upsert(&index, &docs, cancel))
            .await
    }

    async fn get(&self, index: &str, id: &str) -> Result<Hit, StoreError> {
        let (index, id) = (index.to_string(), id.to_string());
        self.blocking(move |inner, _| inner.get(&index, &id)).await
    }

    async fn delete(&self, index: &str, id: &str) -> Result<(), StoreError> {
        let (index, id) = (index.to_string(), id.to_string());
        self.blocking(move |inner, cancel| inner.delete(&index, &id, cancel))
            .await
    }

    async fn count(&self, index: &str) -> Result<u64, StoreError> {
        let index = index.to_string();
        self.blocking(move |inner, _| inner.count(&index)).await
    }

    async fn search(
        &self,
        indices: &[String],
        query: &QueryDocument,
        limit: usize,
    ) -> Result<Vec<Hit>, StoreError> {
        let (indices, query) = (indices.to_vec(), query.clone());
        self.blocking(move |inner, _| inner.search(&indices, &query, limit))
            .await
    }

    async fn list(
        &self,
        index: &str,
        query: &QueryDocument,
        from: usize,
        size: usize,
    ) -> Result<ListPage, StoreError> {
        let (index, query) = (index.to_string(), query.clone());
        self.blocking(move |inner, _| inner.list(&index, &query, from, size))
            .await
    }

    async fn scroll_open(
        &self,
        indices: &[String],
        query: &QueryDocument,
        batch_size: usize,
    ) -> Result<ScrollPage, StoreError> {
        let (indices, query) = (indices.to_vec(), query.clone());
        self.blocking(move |inner, cancel| {
            inner.scroll_open(&indices, &query, batch_size, cancel)
        })
        .await
    }

    async fn scroll_next(&self, scroll_id: &str) -> Result<ScrollPage, StoreError> {
        let scroll_id = scroll_id.to_string();
        self.blocking(move |inner, _| inner.scroll_next(&scroll_id))
            .await
    }

    async fn scroll_close(&self, scroll_id: &str) -> Result<(), StoreError> {
        self.inner.scroll_close(scroll_id)
    }
}
