//! Compile query documents into Tantivy queries.
//!
//! - `bool`: `must` clauses are required and scored, `filter` clauses are
//!   required with zero score, `should` clauses add score and become required
//!   (at least one) only when there is no `must` or `filter`. An empty bool
//!   matches everything.
//! - `multi_match`: per field, an OR over the analyzed query terms; fields
//!   are combined with a disjunction max. `AUTO` fuzziness allows 0 edits for
//!   terms up to 2 chars, 1 edit up to 5 chars, 2 edits beyond.
//! - `terms`: OR over exact `path=value` keyword tokens.
//! - `prefix`: the analyzed text must match word for word, the last word as
//!   a prefix of an indexed term.
//! - `match_all`: every live document.

use tantivy::query::{
    AllQuery, BooleanQuery, BoostQuery, ConstScoreQuery, DisjunctionMaxQuery, EmptyQuery,
    FuzzyTermQuery, Occur, Query as TantivyQuery, RegexQuery, TermQuery,
};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::Term;

use crate::document::{keyword_path, keyword_token};
use crate::error::StoreError;
use crate::query::{BoolQuery, MultiMatchQuery, Query, FUZZINESS_AUTO};
use crate::schema::CatalogSchema;
use crate::tokenizer::analyze;

pub fn compile(schema: &CatalogSchema, query: &Query) -> Result<Box<dyn TantivyQuery>, StoreError> {
    match query {
        Query::Bool(b) => compile_bool(schema, b),
        Query::MultiMatch(m) => compile_multi_match(schema, m),
        Query::Terms(t) => {
            let mut fields = t.iter();
            match (fields.next(), fields.next()) {
                (Some((field, values)), None) => Ok(compile_terms(schema, field, values)),
                _ => Err(StoreError::UnsupportedQuery(format!(
                    "terms expects exactly one field, got {}",
                    t.len()
                ))),
            }
        }
        Query::Prefix(p) => {
            let mut fields = p.iter();
            match (fields.next(), fields.next()) {
                (Some((field, text)), None) => compile_prefix(schema, field, text),
                _ => Err(StoreError::UnsupportedQuery(format!(
                    "prefix expects exactly one field, got {}",
                    p.len()
                ))),
            }
        }
        Query::MatchAll(_) => Ok(Box::new(AllQuery)),
    }
}

fn compile_bool(schema: &CatalogSchema, b: &BoolQuery) -> Result<Box<dyn TantivyQuery>, StoreError> {
    if b.must.is_empty() && b.filter.is_empty() && b.should.is_empty() {
        return Ok(Box::new(AllQuery));
    }

    let mut clauses: Vec<(Occur, Box<dyn TantivyQuery>)> = Vec::new();
    for q in &b.must {
        clauses.push((Occur::Must, compile(schema, q)?));
    }
    for q in &b.filter {
        let gate = ConstScoreQuery::new(compile(schema, q)?, 0.0);
        clauses.push((Occur::Must, Box::new(gate)));
    }
    // With required clauses present, tantivy treats should as optional scoring.
    for q in &b.should {
        clauses.push((Occur::Should, compile(schema, q)?));
    }
    Ok(Box::new(BooleanQuery::new(clauses)))
}

fn compile_multi_match(
    schema: &CatalogSchema,
    m: &MultiMatchQuery,
) -> Result<Box<dyn TantivyQuery>, StoreError> {
    let fuzzy = match m.fuzziness.as_deref() {
        None => false,
        Some(f) if f.eq_ignore_ascii_case(FUZZINESS_AUTO) => true,
        Some(other) => {
            return Err(StoreError::UnsupportedQuery(format!(
                "fuzziness {other:?}"
            )))
        }
    };

    let terms = analyze(&m.query);
    if terms.is_empty() {
        return Ok(Box::new(EmptyQuery));
    }

    let fields = if m.fields.is_empty() {
        vec![(schema.text, 1.0)]
    } else {
        m.fields
            .iter()
            .map(|spec| parse_field(schema, spec))
            .collect::<Result<Vec<_>, _>>()?
    };

    let per_field: Vec<Box<dyn TantivyQuery>> = fields
        .into_iter()
        .map(|(field, boost)| {
            let clauses = terms
                .iter()
                .map(|t| (Occur::Should, term_query(field, t, fuzzy)))
                .collect();
            let q: Box<dyn TantivyQuery> = Box::new(BooleanQuery::new(clauses));
            if (boost - 1.0).abs() > f32::EPSILON {
                Box::new(BoostQuery::new(q, boost)) as Box<dyn TantivyQuery>
            } else {
                q
            }
        })
        .collect();

    Ok(Box::new(DisjunctionMaxQuery::new(per_field)))
}

fn compile_terms(schema: &CatalogSchema, field: &str, values: &[String]) -> Box<dyn TantivyQuery> {
    if values.is_empty() {
        return Box::new(EmptyQuery);
    }
    let path = keyword_path(field);
    let clauses = values
        .iter()
        .map(|v| {
            let term = Term::from_field_text(schema.keyword, &keyword_token(path, v));
            let q: Box<dyn TantivyQuery> = Box::new(TermQuery::new(term, IndexRecordOption::Basic));
            (Occur::Should, q)
        })
        .collect();
    Box::new(BooleanQuery::new(clauses))
}

fn compile_prefix(
    schema: &CatalogSchema,
    field: &str,
    text: &str,
) -> Result<Box<dyn TantivyQuery>, StoreError> {
    let mut terms = analyze(text);
    let Some(last) = terms.pop() else {
        return Ok(Box::new(EmptyQuery));
    };
    let field = schema.analyzed_field(field);
    let mut clauses: Vec<(Occur, Box<dyn TantivyQuery>)> = terms
        .iter()
        .map(|t| (Occur::Must, term_query(field, t, false)))
        .collect();
    // Analyzed terms hold only letters and digits, nothing to escape.
    let prefix = RegexQuery::from_pattern(&format!("{last}.*"), field)?;
    clauses.push((Occur::Must, Box::new(prefix)));
    Ok(Box::new(BooleanQuery::new(clauses)))
}

/// Parse `name` or `name^boost`.
fn parse_field(schema: &CatalogSchema, spec: &str) -> Result<(Field, f32), StoreError> {
    let (name, boost) = match spec.split_once('^') {
        Some((name, boost)) => {
            let boost = boost
                .parse::<f32>()
                .ok()
                .filter(|b| b.is_finite() && *b >= 0.0)
                .ok_or_else(|| StoreError::UnsupportedQuery(format!("field boost {spec:?}")))?;
            (name, boost)
        }
        None => (spec, 1.0),
    };
    Ok((schema.analyzed_field(name), boost))
}

fn term_query(field: Field, text: &str, fuzzy: bool) -> Box<dyn TantivyQuery> {
    let term = Term::from_field_text(field, text);
    let distance = if fuzzy { auto_distance(text) } else { 0 };
    if distance == 0 {
        Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs))
    } else {
        Box::new(FuzzyTermQuery::new(term, distance, true))
    }
}

/// Edit distance allowed by `AUTO` fuzziness.
pub fn auto_distance(term: &str) -> u8 {
    match term.chars().count() {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::build_catalog_schema;
    use std::collections::BTreeMap;

    #[test]
    fn test_auto_distance() {
        assert_eq!(auto_distance("ab"), 0);
        assert_eq!(auto_distance("abc"), 1);
        assert_eq!(auto_distance("abcde"), 1);
        assert_eq!(auto_distance("abcdef"), 2);
        assert_eq!(auto_distance("éé"), 0);
    }

    #[test]
    fn test_parse_field() {
        let schema = build_catalog_schema();
        assert_eq!(parse_field(&schema, "urn^10").unwrap(), (schema.urn, 10.0));
        assert_eq!(parse_field(&schema, "name").unwrap(), (schema.name, 1.0));
        assert_eq!(parse_field(&schema, "data.x^2").unwrap(), (schema.text, 2.0));
        assert!(parse_field(&schema, "name^high").is_err());
    }

    #[test]
    fn test_unsupported_constructs() {
        let schema = build_catalog_schema();

        let mut two = BTreeMap::new();
        two.insert("a.keyword".to_string(), vec!["x".to_string()]);
        two.insert("b.keyword".to_string(), vec!["y".to_string()]);
        assert!(matches!(
            compile(&schema, &Query::Terms(two)),
            Err(StoreError::UnsupportedQuery(_))
        ));

        let bad_fuzz = Query::MultiMatch(MultiMatchQuery {
            query: "x".into(),
            fields: vec![],
            fuzziness: Some("3".into()),
        });
        assert!(matches!(
            compile(&schema, &bad_fuzz),
            Err(StoreError::UnsupportedQuery(_))
        ));
    }

    #[test]
    fn test_compiles_builder_output() {
        let schema = build_catalog_schema();
        let request = crate::query::SearchRequest::new("orderTopic")
            .with_filter("service", vec!["kafka".into()])
            .with_query("description", "events");
        let doc = crate::builder::build_search_query(&request).unwrap();
        assert!(compile(&schema, &doc.query).is_ok());
        assert!(compile(&schema, &Query::match_all()).is_ok());
        assert!(compile(&schema, &Query::prefix("name", "order top")).is_ok());
    }

    #[test]
    fn test_prefix_expects_one_field() {
        let schema = build_catalog_schema();
        let mut two = BTreeMap::new();
        two.insert("name".to_string(), "ord".to_string());
        two.insert("urn".to_string(), "kafka".to_string());
        assert!(matches!(
            compile(&schema, &Query::Prefix(two)),
            Err(StoreError::UnsupportedQuery(_))
        ));
    }
}
