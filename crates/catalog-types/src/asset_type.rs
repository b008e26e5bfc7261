//! Type registry: the closed set of asset kinds the catalog accepts.

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Kind of a cataloged asset.
///
/// Each kind is backed by its own search index, named after [`AssetType::as_str`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    #[default]
    Table,
    Job,
    Dashboard,
    Topic,
}

impl AssetType {
    /// Every registered type, in registry order.
    pub const ALL: [AssetType; 4] = [
        AssetType::Table,
        AssetType::Job,
        AssetType::Dashboard,
        AssetType::Topic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Table => "table",
            AssetType::Job => "job",
            AssetType::Dashboard => "dashboard",
            AssetType::Topic => "topic",
        }
    }

    /// Parse from string, returning None for unknown types.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "table" => Some(AssetType::Table),
            "job" => Some(AssetType::Job),
            "dashboard" => Some(AssetType::Dashboard),
            "topic" => Some(AssetType::Topic),
            _ => None,
        }
    }

    /// Whether `s` names a registered type.
    pub fn is_valid(s: &str) -> bool {
        Self::parse(s).is_some()
    }

    /// Name of the search index backing this type.
    pub fn index_name(&self) -> &'static str {
        self.as_str()
    }
}

impl std::str::FromStr for AssetType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CatalogError::InvalidType(s.to_string()))
    }
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_conversion() {
        assert_eq!(AssetType::Dashboard.as_str(), "dashboard");
        assert_eq!(AssetType::parse("topic"), Some(AssetType::Topic));
        assert_eq!(AssetType::parse("Topic"), None);
        assert_eq!("job".parse::<AssetType>().unwrap(), AssetType::Job);
        assert!(matches!(
            "stream".parse::<AssetType>(),
            Err(CatalogError::InvalidType(name)) if name == "stream"
        ));
    }

    #[test]
    fn test_is_valid() {
        for ty in AssetType::ALL {
            assert!(AssetType::is_valid(ty.as_str()));
        }
        assert!(!AssetType::is_valid(""));
        assert!(!AssetType::is_valid("universe"));
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&AssetType::Table).unwrap();
        assert_eq!(json, "\"table\"");
        let decoded: AssetType = serde_json::from_str("\"dashboard\"").unwrap();
        assert_eq!(decoded, AssetType::Dashboard);
        assert!(serde_json::from_str::<AssetType>("\"widget\"").is_err());
    }

    #[test]
    fn test_display_matches_index_name() {
        assert_eq!(AssetType::Topic.to_string(), AssetType::Topic.index_name());
    }
}
