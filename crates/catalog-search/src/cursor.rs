//! Lazy scan cursor over one type index.
//!
//! A [`ScanCursor`] owns one scroll at the store. It is single-consumer:
//! `next` takes `&mut self`, and `close` consumes the cursor so it runs once.
//!
//! State machine: `Open` → `Exhausted` (a fetch came back empty) → closed.
//! The cursor always holds the next undelivered batch, so `has_more` is
//! exact: it is true only while that batch is non-empty.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use catalog_types::{Asset, AssetType};

use crate::error::SearchError;
use crate::orchestrator::bounded;
use crate::store::{Hit, IndexStore, ScrollPage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Open,
    Exhausted,
    Closed,
}

pub struct ScanCursor {
    store: Arc<dyn IndexStore>,
    asset_type: AssetType,
    /// Held until the scroll is released at the store
    scroll_id: Option<String>,
    state: CursorState,
    buffer: Vec<Hit>,
    timeout: Duration,
}

impl ScanCursor {
    pub(crate) fn new(
        store: Arc<dyn IndexStore>,
        asset_type: AssetType,
        first: ScrollPage,
        timeout: Duration,
    ) -> Self {
        let state = if first.hits.is_empty() {
            CursorState::Exhausted
        } else {
            CursorState::Open
        };
        debug!(index = asset_type.index_name(), scroll_id = %first.scroll_id, ?state, "Opened scan cursor");
        Self {
            store,
            asset_type,
            scroll_id: Some(first.scroll_id),
            state,
            buffer: first.hits,
            timeout,
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    pub fn has_more(&self) -> bool {
        self.state == CursorState::Open
    }

    /// Return the next batch and fetch the one after it.
    ///
    /// Returns an empty batch once the cursor is exhausted.
    pub async fn next(&mut self) -> Result<Vec<Asset>, SearchError> {
        if self.state != CursorState::Open {
            return Ok(Vec::new());
        }
        let Some(scroll_id) = self.scroll_id.as_deref() else {
            return Ok(Vec::new());
        };

        let index = self.asset_type.index_name();
        let page = bounded(
            self.timeout,
            "scroll_next",
            index,
            self.store.scroll_next(scroll_id),
        )
        .await?;
        if page.hits.is_empty() {
            self.state = CursorState::Exhausted;
            debug!(index, "Scan cursor exhausted");
        }

        let batch = std::mem::replace(&mut self.buffer, page.hits);
        batch
            .into_iter()
            .map(|hit| serde_json::from_value(hit.source).map_err(SearchError::from))
            .collect()
    }

    /// Release the scroll at the store.
    pub async fn close(mut self) -> Result<(), SearchError> {
        self.state = CursorState::Closed;
        self.buffer.clear();
        let Some(scroll_id) = self.scroll_id.take() else {
            return Ok(());
        };
        let index = self.asset_type.index_name();
        bounded(
            self.timeout,
            "scroll_close",
            index,
            self.store.scroll_close(&scroll_id),
        )
        .await?;
        debug!(index, "Closed scan cursor");
        Ok(())
    }
}

impl Drop for ScanCursor {
    fn drop(&mut self) {
        let Some(scroll_id) = self.scroll_id.take() else {
            return;
        };
        warn!(
            index = self.asset_type.index_name(),
            scroll_id = %scroll_id,
            "Scan cursor dropped without close"
        );
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let store = self.store.clone();
            handle.spawn(async move {
                if let Err(e) = store.scroll_close(&scroll_id).await {
                    debug!(error = %e, "Background scroll release failed");
                }
            });
        }
    }
}
