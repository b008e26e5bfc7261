//! Tantivy schema shared by every catalog index.
//!
//! - `id`: STRING | STORED, document identity (the asset urn)
//! - `source`: STORED, the full JSON document
//! - `urn`, `name`, `service`, `description`: analyzed with the catalog tokenizer
//! - `text`: analyzed catch-all of every string and number leaf
//! - `keyword`: STRING, multi-valued `path=value` tokens for exact filters

use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING,
};

use crate::error::StoreError;
use crate::tokenizer::CATALOG_TOKENIZER;

/// Top-level source fields that get their own analyzed field.
pub const ANALYZED_FIELDS: [&str; 4] = ["urn", "name", "service", "description"];

/// Catch-all field searched when a query names no fields.
pub const CATCH_ALL_FIELD: &str = "text";

#[derive(Debug, Clone)]
pub struct CatalogSchema {
    schema: Schema,
    pub id: Field,
    pub source: Field,
    pub urn: Field,
    pub name: Field,
    pub service: Field,
    pub description: Field,
    pub text: Field,
    pub keyword: Field,
}

impl CatalogSchema {
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Rebuild field handles from an opened index's schema.
    pub fn from_schema(schema: Schema) -> Result<Self, StoreError> {
        let field = |name: &str| {
            schema
                .get_field(name)
                .map_err(|_| StoreError::SchemaMismatch(format!("missing {name} field")))
        };
        Ok(Self {
            id: field("id")?,
            source: field("source")?,
            urn: field("urn")?,
            name: field("name")?,
            service: field("service")?,
            description: field("description")?,
            text: field(CATCH_ALL_FIELD)?,
            keyword: field("keyword")?,
            schema,
        })
    }

    /// Resolve a query field name to an analyzed field.
    ///
    /// Names without a dedicated field fall back to the catch-all.
    pub fn analyzed_field(&self, name: &str) -> Field {
        match name {
            "urn" => self.urn,
            "name" => self.name,
            "service" => self.service,
            "description" => self.description,
            _ => self.text,
        }
    }
}

fn analyzed() -> TextOptions {
    TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer(CATALOG_TOKENIZER)
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    )
}

pub fn build_catalog_schema() -> CatalogSchema {
    let mut schema_builder = Schema::builder();

    let id = schema_builder.add_text_field("id", STRING | STORED);
    let source = schema_builder.add_text_field("source", STORED);
    let urn = schema_builder.add_text_field("urn", analyzed());
    let name = schema_builder.add_text_field("name", analyzed());
    let service = schema_builder.add_text_field("service", analyzed());
    let description = schema_builder.add_text_field("description", analyzed());
    let text = schema_builder.add_text_field(CATCH_ALL_FIELD, analyzed());
    let keyword = schema_builder.add_text_field("keyword", STRING);

    CatalogSchema {
        schema: schema_builder.build(),
        id,
        source,
        urn,
        name,
        service,
        description,
        text,
        keyword,
    }
}
