//! Asset type for catalog storage.
//!
//! An asset wraps arbitrary platform-specific data with the catalog's
//! context: identity, kind, origin service, labels and owners.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::asset_type::AssetType;

/// Opaque reference to a user, as contributed by the origin platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub provider: String,
}

impl Owner {
    pub fn new(id: impl Into<String>, email: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            provider: provider.into(),
        }
    }
}

/// A cataloged metadata entity.
///
/// `urn` is the stable natural key and must be non-empty before the asset is
/// written to a search index. `id` is assigned by the canonical store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Canonical store identifier
    #[serde(default)]
    pub id: String,

    /// Stable natural key
    #[serde(default)]
    pub urn: String,

    #[serde(rename = "type", default)]
    pub asset_type: AssetType,

    /// Origin platform (e.g. "kafka", "bigquery")
    #[serde(default)]
    pub service: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Platform-specific payload
    #[serde(default)]
    pub data: Map<String, Value>,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<Owner>,

    /// Current MAJOR.MINOR version; empty until first written
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<Owner>,

    #[serde(default)]
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl Asset {
    /// Create an asset with identity, kind, service and name set.
    pub fn new(
        urn: impl Into<String>,
        asset_type: AssetType,
        service: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            urn: urn.into(),
            asset_type,
            service: service.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_owner(mut self, owner: Owner) -> Self {
        self.owners.push(owner);
        self
    }

    /// Replace the data payload. Non-object values are ignored.
    pub fn with_data(mut self, data: Value) -> Self {
        if let Value::Object(map) = data {
            self.data = map;
        }
        self
    }

    /// Whether the identity key required for indexing is present.
    pub fn has_urn(&self) -> bool {
        !self.urn.trim().is_empty()
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_asset_serialization() {
        let asset = Asset::new("urn:bq:orders", AssetType::Table, "bigquery", "orders")
            .with_description("All orders")
            .with_label("team", "payments")
            .with_owner(Owner::new("u1", "jane@example.com", "shield"))
            .with_data(json!({"columns": [{"name": "id"}]}));

        let bytes = asset.to_bytes().unwrap();
        let decoded = Asset::from_bytes(&bytes).unwrap();

        assert_eq!(asset, decoded);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let asset: Asset = serde_json::from_str(r#"{"name": "old-name"}"#).unwrap();
        assert_eq!(asset.name, "old-name");
        assert_eq!(asset.asset_type, AssetType::Table);
        assert!(asset.data.is_empty());
        assert!(asset.labels.is_empty());
        assert!(!asset.has_urn());
    }

    #[test]
    fn test_type_field_is_named_type() {
        let asset = Asset::new("urn:x", AssetType::Topic, "kafka", "x");
        let value = serde_json::to_value(&asset).unwrap();
        assert_eq!(value["type"], json!("topic"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result = serde_json::from_str::<Asset>(r#"{"urn": "x", "type": "widget"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_with_data_ignores_non_objects() {
        let asset = Asset::default().with_data(json!([1, 2, 3]));
        assert!(asset.data.is_empty());
    }

    #[test]
    fn test_blank_urn_is_not_an_identity() {
        let asset = Asset::new("   ", AssetType::Job, "airflow", "daily");
        assert!(!asset.has_urn());
    }
}
