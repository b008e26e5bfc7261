//! Write preparation: old snapshot + new snapshot -> versioned asset.

use chrono::{DateTime, Utc};
use tracing::debug;

use catalog_types::{Asset, AssetVersion, CatalogError, Changelog, Owner};

use crate::diff::diff;
use crate::version::{next_version, BASE_VERSION};

/// Outcome of preparing one logical write.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedWrite {
    /// Asset ready for the canonical store and the search index
    pub asset: Asset,
    /// Version record to append, present only when something changed
    pub version: Option<AssetVersion>,
    pub changelog: Changelog,
}

impl PreparedWrite {
    pub fn changed(&self) -> bool {
        !self.changelog.is_empty()
    }
}

/// Prepare `incoming` for persistence against the `current` snapshot.
///
/// A first write gets [`BASE_VERSION`] and no version record. A later write
/// bumps the minor version only when the diff is non-empty.
pub fn prepare_write(
    current: Option<&Asset>,
    incoming: Asset,
    updated_by: &Owner,
    now: DateTime<Utc>,
) -> Result<PreparedWrite, CatalogError> {
    if !incoming.has_urn() {
        return Err(CatalogError::EmptyUrn);
    }

    let mut asset = incoming;
    asset.updated_by = Some(updated_by.clone());
    asset.updated_at = now;

    let Some(current) = current else {
        asset.version = BASE_VERSION.to_string();
        asset.created_at = now;
        debug!(urn = %asset.urn, version = %asset.version, "Prepared first write");
        return Ok(PreparedWrite {
            asset,
            version: None,
            changelog: Changelog::new(),
        });
    };

    asset.id = current.id.clone();
    asset.created_at = current.created_at;

    let current_version = if current.version.is_empty() {
        BASE_VERSION
    } else {
        current.version.as_str()
    };

    let changelog = diff(current, &asset)?;
    asset.version = next_version(current_version, !changelog.is_empty())?;

    let version = (!changelog.is_empty()).then(|| AssetVersion {
        id: asset.id.clone(),
        urn: asset.urn.clone(),
        asset_type: asset.asset_type,
        service: asset.service.clone(),
        version: asset.version.clone(),
        changelog: changelog.clone(),
        updated_by: updated_by.clone(),
        created_at: now,
        updated_at: now,
    });

    debug!(
        urn = %asset.urn,
        version = %asset.version,
        changes = changelog.len(),
        "Prepared write"
    );

    Ok(PreparedWrite {
        asset,
        version,
        changelog,
    })
}
