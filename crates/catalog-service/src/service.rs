//! Asset service: the versioned write path and read facade.
//!
//! Writes run patch (for partial updates), then diff and the version ledger,
//! and finally index the result through the [`IndexOrchestrator`]. The
//! current snapshot of an asset is read back from its type index by urn.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info};
use ulid::Ulid;

use catalog_asset::{patch, prepare_write, PreparedWrite};
use catalog_search::{
    AssetPage, IndexOrchestrator, MigrationReport, PageRequest, RecordFilter, ScanCursor,
    SearchRequest, SearchResult,
};
use catalog_types::{Asset, AssetType, AssetVersion, CatalogError, Changelog, Owner};

use crate::error::{Result, ServiceError};

/// Result of one versioned write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    /// Asset as indexed
    pub asset: Asset,
    /// Version record, present only when the write changed something
    pub version: Option<AssetVersion>,
    pub changelog: Changelog,
    /// False when the asset did not exist before this write
    pub existed: bool,
}

impl WriteOutcome {
    fn new(prepared: PreparedWrite, existed: bool) -> Self {
        Self {
            asset: prepared.asset,
            version: prepared.version,
            changelog: prepared.changelog,
            existed,
        }
    }

    pub fn changed(&self) -> bool {
        !self.changelog.is_empty()
    }
}

#[derive(Clone)]
pub struct AssetService {
    orchestrator: Arc<IndexOrchestrator>,
}

impl AssetService {
    pub fn new(orchestrator: Arc<IndexOrchestrator>) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &IndexOrchestrator {
        &self.orchestrator
    }

    pub async fn migrate(&self) -> Result<MigrationReport> {
        Ok(self.orchestrator.migrate().await?)
    }

    /// Current snapshot of `urn`, or `None` if it was never indexed.
    async fn current(&self, ty: AssetType, urn: &str) -> Result<Option<Asset>> {
        match self.orchestrator.get_by_id(ty, urn).await {
            Ok(asset) => Ok(Some(asset)),
            Err(e) => {
                let err = ServiceError::from(e);
                if err.is_not_found() {
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn write(
        &self,
        current: Option<&Asset>,
        incoming: Asset,
        updated_by: &Owner,
    ) -> Result<WriteOutcome> {
        let mut prepared = prepare_write(current, incoming, updated_by, Utc::now())?;
        if prepared.asset.id.is_empty() {
            prepared.asset.id = Ulid::new().to_string();
        }

        let ty = prepared.asset.asset_type;
        self.orchestrator
            .create_or_replace_many(ty, std::slice::from_ref(&prepared.asset))
            .await?;

        let outcome = WriteOutcome::new(prepared, current.is_some());
        info!(
            urn = %outcome.asset.urn,
            asset_type = %ty,
            version = %outcome.asset.version,
            changes = outcome.changelog.len(),
            "Asset written"
        );
        Ok(outcome)
    }

    /// Create or fully replace an asset, versioning the change.
    pub async fn upsert(&self, incoming: Asset, updated_by: &Owner) -> Result<WriteOutcome> {
        if !incoming.has_urn() {
            return Err(CatalogError::EmptyUrn.into());
        }
        let current = self.current(incoming.asset_type, &incoming.urn).await?;
        self.write(current.as_ref(), incoming, updated_by).await
    }

    /// Apply a partial update to an existing asset.
    ///
    /// Fails with not-found when the asset does not exist. A payload that
    /// changes `type` or `urn` is rejected: both are part of the identity
    /// the asset is indexed under.
    pub async fn patch(
        &self,
        ty: AssetType,
        urn: &str,
        payload: &Map<String, Value>,
        updated_by: &Owner,
    ) -> Result<WriteOutcome> {
        let current = self.orchestrator.get_by_id(ty, urn).await?;
        let patched = patch(&current, payload);
        if patched.asset_type != current.asset_type {
            return Err(ServiceError::TypeChange {
                urn: urn.to_string(),
                from: current.asset_type,
                to: patched.asset_type,
            });
        }
        if patched.urn != current.urn {
            return Err(ServiceError::UrnChange {
                from: current.urn,
                to: patched.urn,
            });
        }
        debug!(urn, fields = payload.len(), "Patched asset");
        self.write(Some(&current), patched, updated_by).await
    }

    /// Bulk index assets as-is, grouped by type. No versioning is applied.
    pub async fn ingest(&self, assets: Vec<Asset>) -> Result<BTreeMap<AssetType, usize>> {
        if assets.iter().any(|a| !a.has_urn()) {
            return Err(CatalogError::EmptyUrn.into());
        }
        let mut by_type: BTreeMap<AssetType, Vec<Asset>> = BTreeMap::new();
        for asset in assets {
            by_type.entry(asset.asset_type).or_default().push(asset);
        }

        let mut written = BTreeMap::new();
        for (ty, batch) in by_type {
            let n = self.orchestrator.create_or_replace_many(ty, &batch).await?;
            written.insert(ty, n);
        }
        Ok(written)
    }

    pub async fn get(&self, ty: AssetType, urn: &str) -> Result<Asset> {
        Ok(self.orchestrator.get_by_id(ty, urn).await?)
    }

    pub async fn delete(&self, ty: AssetType, urn: &str) -> Result<()> {
        Ok(self.orchestrator.delete(ty, urn).await?)
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        Ok(self.orchestrator.search(request).await?)
    }

    pub async fn suggest(&self, request: &SearchRequest) -> Result<Vec<String>> {
        Ok(self.orchestrator.suggest(request).await?)
    }

    pub async fn get_page(&self, ty: AssetType, request: &PageRequest) -> Result<AssetPage> {
        Ok(self.orchestrator.get_page(ty, request).await?)
    }

    pub async fn get_all(&self, ty: AssetType, filters: &RecordFilter) -> Result<Vec<Asset>> {
        Ok(self.orchestrator.get_all(ty, filters).await?)
    }

    pub async fn scan(&self, ty: AssetType, filters: &RecordFilter) -> Result<ScanCursor> {
        Ok(self.orchestrator.get_all_iterator(ty, filters).await?)
    }

    pub async fn type_counts(&self) -> Result<BTreeMap<AssetType, u64>> {
        Ok(self.orchestrator.type_counts().await?)
    }
}
