//! Change and asset version types.
//!
//! A changelog is the ordered list of structural deltas between two
//! snapshots of one asset. Each write that produces a non-empty changelog
//! is recorded as an immutable [`AssetVersion`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::asset::Owner;
use crate::asset_type::AssetType;

/// Kind of structural delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Create => write!(f, "create"),
            ChangeKind::Update => write!(f, "update"),
            ChangeKind::Delete => write!(f, "delete"),
        }
    }
}

/// One structural delta located by `path`.
///
/// `path` holds map keys and stringified array indices from the asset root.
/// `Value::Null` in `from` or `to` stands for an absent node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub path: Vec<String>,
    #[serde(default)]
    pub from: Value,
    #[serde(default)]
    pub to: Value,
}

impl Change {
    pub fn create(path: Vec<String>, to: Value) -> Self {
        Self {
            kind: ChangeKind::Create,
            path,
            from: Value::Null,
            to,
        }
    }

    pub fn update(path: Vec<String>, from: Value, to: Value) -> Self {
        Self {
            kind: ChangeKind::Update,
            path,
            from,
            to,
        }
    }

    pub fn delete(path: Vec<String>, from: Value) -> Self {
        Self {
            kind: ChangeKind::Delete,
            path,
            from,
            to: Value::Null,
        }
    }

    /// Dotted rendering of the path, e.g. `data.some_array.0.id`.
    pub fn path_string(&self) -> String {
        self.path.join(".")
    }
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}: {} -> {}",
            self.kind,
            self.path_string(),
            self.from,
            self.to
        )
    }
}

/// Ordered list of changes between two snapshots.
pub type Changelog = Vec<Change>;

/// Immutable record of one version transition of an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetVersion {
    pub id: String,
    pub urn: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub service: String,
    pub version: String,
    pub changelog: Changelog,
    pub updated_by: Owner,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_change_constructors() {
        let c = Change::create(vec!["data".into(), "k".into()], json!("v"));
        assert_eq!(c.kind, ChangeKind::Create);
        assert_eq!(c.from, Value::Null);

        let d = Change::delete(vec!["labels".into(), "team".into()], json!("x"));
        assert_eq!(d.kind, ChangeKind::Delete);
        assert_eq!(d.to, Value::Null);
    }

    #[test]
    fn test_change_display() {
        let c = Change::update(
            vec!["data".into(), "some_array".into(), "0".into(), "id".into()],
            json!("e1"),
            json!("e2"),
        );
        assert_eq!(c.path_string(), "data.some_array.0.id");
        assert_eq!(c.to_string(), "update data.some_array.0.id: \"e1\" -> \"e2\"");
    }

    #[test]
    fn test_change_serialization() {
        let c = Change::create(vec!["description".into()], json!("text"));
        let value = serde_json::to_value(&c).unwrap();
        assert_eq!(value["type"], json!("create"));
        assert_eq!(value["path"], json!(["description"]));

        let decoded: Change = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, c);
    }
}
