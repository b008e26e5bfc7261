//! Query documents and request types.
//!
//! A [`QueryDocument`] is the store-neutral form the query builder emits and
//! an [`IndexStore`](crate::store::IndexStore) evaluates. It serializes to
//! the familiar bool / multi_match / terms / match_all JSON DSL.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use catalog_types::AssetType;

/// Fuzziness derived from term length.
pub const FUZZINESS_AUTO: &str = "AUTO";

/// Field name to accepted values. Values within a field are OR'ed,
/// fields are AND'ed.
pub type RecordFilter = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    Bool(BoolQuery),
    MultiMatch(MultiMatchQuery),
    /// Exactly one field to its accepted values
    Terms(BTreeMap<String, Vec<String>>),
    /// Exactly one field to a text whose last word is matched as a prefix
    Prefix(BTreeMap<String, String>),
    MatchAll(MatchAllQuery),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoolQuery {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<Query>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Query>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<Query>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiMatchQuery {
    pub query: String,
    /// Field names, optionally suffixed with `^boost`; empty means all fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuzziness: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchAllQuery {}

impl Query {
    pub fn match_all() -> Self {
        Query::MatchAll(MatchAllQuery {})
    }

    pub fn terms(field: impl Into<String>, values: Vec<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(field.into(), values);
        Query::Terms(map)
    }

    pub fn prefix(field: impl Into<String>, text: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(field.into(), text.into());
        Query::Prefix(map)
    }

    pub fn multi_match(query: impl Into<String>, fields: &[&str], fuzzy: bool) -> Self {
        Query::MultiMatch(MultiMatchQuery {
            query: query.into(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            fuzziness: fuzzy.then(|| FUZZINESS_AUTO.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDocument {
    pub query: Query,
    /// Hits scoring below this are dropped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f64>,
}

impl QueryDocument {
    pub fn new(query: Query) -> Self {
        Self {
            query,
            min_score: None,
        }
    }
}

/// Ranked search request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    pub text: String,
    pub filters: RecordFilter,
    /// Field name to fuzzy-matched text, applied as filters
    pub queries: BTreeMap<String, String>,
    /// Per-request type whitelist; empty means every type
    pub type_whitelist: Vec<AssetType>,
    /// Result cap; 0 means the configured default
    pub max_results: usize,
}

impl SearchRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, field: impl Into<String>, values: Vec<String>) -> Self {
        self.filters.insert(field.into(), values);
        self
    }

    pub fn with_query(mut self, field: impl Into<String>, text: impl Into<String>) -> Self {
        self.queries.insert(field.into(), text.into());
        self
    }

    pub fn with_types(mut self, types: Vec<AssetType>) -> Self {
        self.type_whitelist = types;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}
