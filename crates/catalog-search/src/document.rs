//! Document mapping from JSON sources to Tantivy documents.

use serde_json::Value;
use tantivy::TantivyDocument;

use crate::error::StoreError;
use crate::schema::{CatalogSchema, ANALYZED_FIELDS};

/// Strings longer than this are not exact-filterable.
pub const KEYWORD_IGNORE_ABOVE: usize = 256;

/// Suffix addressing the exact-match form of a field path.
pub const KEYWORD_SUFFIX: &str = ".keyword";

/// One record handed to a bulk upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDocument {
    pub id: String,
    pub source: Value,
}

impl IndexDocument {
    pub fn new(id: impl Into<String>, source: Value) -> Self {
        Self {
            id: id.into(),
            source,
        }
    }
}

/// Keyword token for `path` holding `value`.
pub fn keyword_token(path: &str, value: &str) -> String {
    format!("{path}={value}")
}

/// Strip the `.keyword` suffix from a filter field, if present.
pub fn keyword_path(field: &str) -> &str {
    field.strip_suffix(KEYWORD_SUFFIX).unwrap_or(field)
}

/// Convert an index document to a Tantivy document.
///
/// The source must be a JSON object. Dedicated fields are filled from
/// top-level strings; every string and number leaf feeds the catch-all
/// field; every string leaf also yields a `path=value` keyword with array
/// indices elided from the path.
pub fn to_tantivy_doc(
    schema: &CatalogSchema,
    doc: &IndexDocument,
) -> Result<TantivyDocument, StoreError> {
    let Value::Object(root) = &doc.source else {
        return Err(StoreError::InvalidDocument(format!(
            "source of {} is not an object",
            doc.id
        )));
    };

    let mut out = TantivyDocument::default();
    out.add_text(schema.id, &doc.id);
    out.add_text(schema.source, serde_json::to_string(&doc.source)?);

    for name in ANALYZED_FIELDS {
        if let Some(Value::String(s)) = root.get(name) {
            out.add_text(schema.analyzed_field(name), s);
        }
    }

    let mut path = Vec::new();
    collect_leaves(schema, &doc.source, &mut path, &mut out);
    Ok(out)
}

fn collect_leaves<'a>(
    schema: &CatalogSchema,
    value: &'a Value,
    path: &mut Vec<&'a str>,
    out: &mut TantivyDocument,
) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                path.push(key);
                collect_leaves(schema, child, path, out);
                path.pop();
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_leaves(schema, item, path, out);
            }
        }
        Value::String(s) => {
            out.add_text(schema.text, s);
            if s.chars().count() <= KEYWORD_IGNORE_ABOVE && !path.is_empty() {
                out.add_text(schema.keyword, keyword_token(&path.join("."), s));
            }
        }
        Value::Number(n) => out.add_text(schema.text, n.to_string()),
        Value::Bool(_) | Value::Null => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::build_catalog_schema;
    use serde_json::json;
    use tantivy::schema::Value as _;

    fn texts(doc: &TantivyDocument, field: tantivy::schema::Field) -> Vec<String> {
        doc.get_all(field)
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_document_fields() {
        let schema = build_catalog_schema();
        let source = json!({
            "urn": "urn:kafka:orders",
            "name": "orders",
            "service": "kafka",
            "labels": {"team": "payments"},
            "data": {"partitions": 12, "topics": [{"name": "a"}, {"name": "b"}], "compacted": true}
        });
        let doc = to_tantivy_doc(&schema, &IndexDocument::new("urn:kafka:orders", source)).unwrap();

        assert_eq!(texts(&doc, schema.id), vec!["urn:kafka:orders"]);
        assert_eq!(texts(&doc, schema.name), vec!["orders"]);
        assert!(texts(&doc, schema.description).is_empty());

        let keywords = texts(&doc, schema.keyword);
        assert!(keywords.contains(&"service=kafka".to_string()));
        assert!(keywords.contains(&"labels.team=payments".to_string()));
        assert!(keywords.contains(&"data.topics.name=a".to_string()));
        assert!(keywords.contains(&"data.topics.name=b".to_string()));

        let catch_all = texts(&doc, schema.text);
        assert!(catch_all.contains(&"12".to_string()));
        assert!(!catch_all.contains(&"true".to_string()));
    }

    #[test]
    fn test_source_must_be_object() {
        let schema = build_catalog_schema();
        let err = to_tantivy_doc(&schema, &IndexDocument::new("x", json!([1]))).unwrap_err();
        assert!(matches!(err, StoreError::InvalidDocument(_)));
    }

    #[test]
    fn test_long_strings_skip_keywords() {
        let schema = build_catalog_schema();
        let long = "x".repeat(KEYWORD_IGNORE_ABOVE + 1);
        let doc = to_tantivy_doc(&schema, &IndexDocument::new("x", json!({"note": long}))).unwrap();
        assert!(texts(&doc, schema.keyword).is_empty());
    }

    #[test]
    fn test_keyword_path() {
        assert_eq!(keyword_path("data.country.keyword"), "data.country");
        assert_eq!(keyword_path("service"), "service");
    }
}
