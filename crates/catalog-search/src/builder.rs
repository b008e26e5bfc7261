//! Query builder for ranked search and unranked scans.

use tracing::debug;

use catalog_types::AssetType;

use crate::document::KEYWORD_SUFFIX;
use crate::error::SearchError;
use crate::query::{BoolQuery, Query, QueryDocument, RecordFilter, SearchRequest};

/// Default cap on ranked search results.
pub const DEFAULT_MAX_RESULTS: usize = 200;

/// Hits scoring below this are dropped from ranked search.
pub const MIN_SCORE: f64 = 0.01;

/// Identity-bearing fields boosted in ranked search.
pub const BOOSTED_FIELDS: [&str; 2] = ["urn^10", "name^5"];

/// Default cap on name suggestions.
pub const DEFAULT_SUGGESTIONS: usize = 5;

/// Field suggestions complete against.
pub const SUGGEST_FIELD: &str = "name";

/// Resolve the types a request may touch.
///
/// An empty whitelist stands for every registered type. The result is the
/// intersection of both, in registry order; it may be empty.
pub fn resolve_indices(global: &[AssetType], local: &[AssetType]) -> Vec<AssetType> {
    AssetType::ALL
        .into_iter()
        .filter(|ty| global.is_empty() || global.contains(ty))
        .filter(|ty| local.is_empty() || local.contains(ty))
        .collect()
}

/// Build the ranked query for `request`.
pub fn build_search_query(request: &SearchRequest) -> Result<QueryDocument, SearchError> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(SearchError::EmptySearchText);
    }

    let should = vec![
        Query::multi_match(text, &BOOSTED_FIELDS, false),
        Query::multi_match(text, &BOOSTED_FIELDS, true),
        Query::multi_match(text, &[], true),
    ];

    let mut filter = filter_clauses(&request.filters);
    filter.extend(
        request
            .queries
            .iter()
            .filter(|(_, q)| !q.trim().is_empty())
            .map(|(field, q)| Query::multi_match(q.trim(), &[field.as_str()], true)),
    );

    let doc = QueryDocument {
        query: Query::Bool(BoolQuery {
            should,
            must: Vec::new(),
            filter,
        }),
        min_score: Some(MIN_SCORE),
    };
    debug!(text, filters = request.filters.len(), "Built search query");
    Ok(doc)
}

/// Build the completion query for `text`.
pub fn build_suggest_query(text: &str) -> Result<QueryDocument, SearchError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(SearchError::EmptySearchText);
    }
    Ok(QueryDocument::new(Query::prefix(SUGGEST_FIELD, text)))
}

/// Build the unranked query for a full scan.
///
/// No filters means match everything.
pub fn build_scan_query(filters: &RecordFilter) -> QueryDocument {
    let must = filter_clauses(filters);
    if must.is_empty() {
        return QueryDocument::new(Query::match_all());
    }
    QueryDocument::new(Query::Bool(BoolQuery {
        must,
        ..Default::default()
    }))
}

// Fields with no accepted values place no constraint.
fn filter_clauses(filters: &RecordFilter) -> Vec<Query> {
    filters
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(field, values)| Query::terms(format!("{field}{KEYWORD_SUFFIX}"), values.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_resolve_indices() {
        use AssetType::*;
        assert_eq!(resolve_indices(&[], &[]), AssetType::ALL.to_vec());
        assert_eq!(resolve_indices(&[Topic, Table], &[]), vec![Table, Topic]);
        assert_eq!(resolve_indices(&[], &[Job]), vec![Job]);
        assert_eq!(
            resolve_indices(&[Table, Topic], &[Topic, Dashboard]),
            vec![Topic]
        );
        assert!(resolve_indices(&[Table], &[Job]).is_empty());
    }

    #[test]
    fn test_empty_text_rejected() {
        for text in ["", "   \t"] {
            let err = build_search_query(&SearchRequest::new(text)).unwrap_err();
            assert!(matches!(err, SearchError::EmptySearchText));
        }
    }

    #[test]
    fn test_search_query_shape() {
        let request = SearchRequest::new("invoice")
            .with_filter("service", vec!["kafka".into(), "rabbitmq".into()])
            .with_filter("data.country", vec!["id".into()])
            .with_filter("ignored", vec![])
            .with_query("data.owner", "jane");

        let doc = build_search_query(&request).unwrap();
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({
                "query": {"bool": {
                    "should": [
                        {"multi_match": {"query": "invoice", "fields": ["urn^10", "name^5"]}},
                        {"multi_match": {"query": "invoice", "fields": ["urn^10", "name^5"], "fuzziness": "AUTO"}},
                        {"multi_match": {"query": "invoice", "fuzziness": "AUTO"}}
                    ],
                    "filter": [
                        {"terms": {"data.country.keyword": ["id"]}},
                        {"terms": {"service.keyword": ["kafka", "rabbitmq"]}},
                        {"multi_match": {"query": "jane", "fields": ["data.owner"], "fuzziness": "AUTO"}}
                    ]
                }},
                "min_score": 0.01
            })
        );
    }

    #[test]
    fn test_suggest_query() {
        assert!(matches!(
            build_suggest_query(" "),
            Err(SearchError::EmptySearchText)
        ));
        assert_eq!(
            serde_json::to_value(build_suggest_query(" ord ").unwrap()).unwrap(),
            json!({"query": {"prefix": {"name": "ord"}}})
        );
    }

    #[test]
    fn test_scan_query_without_filters() {
        assert_eq!(
            build_scan_query(&RecordFilter::new()),
            QueryDocument::new(Query::match_all())
        );
    }

    #[test]
    fn test_scan_query_with_filters() {
        let mut filters = RecordFilter::new();
        filters.insert("landscape".into(), vec!["id".into(), "th".into()]);
        let doc = build_scan_query(&filters);
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({"query": {"bool": {"must": [{"terms": {"landscape.keyword": ["id", "th"]}}]}}})
        );
    }
}
