//! Index mapping specification.
//!
//! The mapping is handed to [`IndexStore::ensure_index`](crate::store::IndexStore::ensure_index)
//! when a type's index is created. Its JSON shape follows the common
//! `{mappings, aliases, settings}` index-creation body.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tokenizer::CAMEL_CASE_PATTERN;

/// Alias every catalog index is reachable through.
pub const DEFAULT_ALIAS: &str = "universe";

/// Name of the analyzer applied to text fields when none is given.
pub const DEFAULT_ANALYZER: &str = "default";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IndexMapping {
    #[serde(default)]
    pub mappings: Mappings,
    #[serde(default)]
    pub aliases: BTreeMap<String, Value>,
    #[serde(default)]
    pub settings: IndexSettings,
}

/// Field mappings; empty means fully dynamic.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Mappings {
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IndexSettings {
    #[serde(default)]
    pub analysis: Analysis,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default)]
    pub analyzer: BTreeMap<String, AnalyzerSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl AnalyzerSpec {
    /// Pattern analyzer splitting on camel-case and non-alphanumeric boundaries.
    pub fn camel_case() -> Self {
        Self {
            kind: "pattern".to_string(),
            pattern: Some(CAMEL_CASE_PATTERN.to_string()),
        }
    }

    pub fn is_camel_case(&self) -> bool {
        self.kind == "pattern" && self.pattern.as_deref() == Some(CAMEL_CASE_PATTERN)
    }
}

impl IndexMapping {
    /// Mapping used for every type index created by migration.
    pub fn catalog() -> Self {
        let mut aliases = BTreeMap::new();
        aliases.insert(DEFAULT_ALIAS.to_string(), Value::Object(Map::new()));

        let mut analyzer = BTreeMap::new();
        analyzer.insert(DEFAULT_ANALYZER.to_string(), AnalyzerSpec::camel_case());

        Self {
            mappings: Mappings::default(),
            aliases,
            settings: IndexSettings {
                analysis: Analysis { analyzer },
            },
        }
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        self.aliases.contains_key(alias)
    }

    /// Analyzers this mapping declares that are not the camel-case pattern.
    pub fn unsupported_analyzers(&self) -> Vec<&str> {
        self.settings
            .analysis
            .analyzer
            .iter()
            .filter(|(_, spec)| !spec.is_camel_case())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
