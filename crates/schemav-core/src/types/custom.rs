//! User-defined types
//!
//! [`CustomType`] wraps a data check registered through `Engine::add_type`.
//! [`RefinedType`] layers an extra check over an existing type while keeping
//! all of its schema rules; `integer` is a refinement of `numeric`.

use serde_json::Value;
use std::sync::Arc;

use super::checks::{self, ItemKind};
use super::SchemaType;
use crate::dispatch::KeywordContext;
use crate::error::Result;
use crate::outcome::KeywordOutcome;
use crate::registry::{KeywordTable, Schema, SchemaScope, TypeCheckFn};

/// A type defined by a single data check
pub struct CustomType {
    check: TypeCheckFn,
}

impl CustomType {
    pub fn new(check: TypeCheckFn) -> Self {
        Self { check }
    }
}

impl SchemaType for CustomType {
    fn validate_schema(&self, schema: &Schema, scope: &SchemaScope<'_>) -> Result<()> {
        if let Some(value) = schema.get("enum") {
            checks::unique_list(value, "enum", ItemKind::Value, scope)?;
        }
        Ok(())
    }

    fn check_data(&self, data: &Value, ctx: &KeywordContext<'_>) -> KeywordOutcome {
        (self.check)(data, ctx)
    }

    fn keywords(&self) -> KeywordTable {
        KeywordTable::new().with("enum", super::enumeration)
    }
}

/// An existing type with one more data check
pub struct RefinedType {
    base: Arc<dyn SchemaType>,
    check: TypeCheckFn,
}

impl RefinedType {
    pub fn new(base: Arc<dyn SchemaType>, check: TypeCheckFn) -> Self {
        Self { base, check }
    }
}

impl SchemaType for RefinedType {
    fn validate_schema(&self, schema: &Schema, scope: &SchemaScope<'_>) -> Result<()> {
        self.base.validate_schema(schema, scope)
    }

    fn check_data(&self, data: &Value, ctx: &KeywordContext<'_>) -> KeywordOutcome {
        self.base
            .check_data(data, ctx)
            .and_then(|| (self.check)(data, ctx))
    }

    fn keywords(&self) -> KeywordTable {
        self.base.keywords()
    }

    fn normalize(&self, schema: &mut Schema) {
        self.base.normalize(schema)
    }

    fn subschemas<'s>(&self, schema: &'s Schema) -> Vec<(String, &'s Value)> {
        self.base.subschemas(schema)
    }

    fn patterns(&self, schema: &Schema) -> Vec<String> {
        self.base.patterns(schema)
    }
}
