//! `boolean` type

use serde_json::Value;

use super::checks::{self, ItemKind};
use super::SchemaType;
use crate::dispatch::KeywordContext;
use crate::error::Result;
use crate::outcome::KeywordOutcome;
use crate::registry::{KeywordTable, Schema, SchemaScope};

/// The generic boolean type
pub struct BooleanType;

impl SchemaType for BooleanType {
    fn validate_schema(&self, schema: &Schema, scope: &SchemaScope<'_>) -> Result<()> {
        if let Some(value) = schema.get("enum") {
            checks::unique_list(value, "enum", ItemKind::Boolean, scope)?;
        }
        Ok(())
    }

    fn check_data(&self, data: &Value, _ctx: &KeywordContext<'_>) -> KeywordOutcome {
        data.is_boolean().into()
    }

    fn keywords(&self) -> KeywordTable {
        KeywordTable::new().with("enum", super::enumeration)
    }
}
