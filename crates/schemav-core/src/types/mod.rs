//! Generic types
//!
//! Each type implements [`SchemaType`]: how its schemas are shaped, which
//! data it accepts, and which keywords it understands. The generic set is
//! `string`, `numeric` (aliased as `number`), `integer`, `boolean`, `array`
//! and `object`.

pub mod array;
pub mod boolean;
pub mod checks;
pub mod custom;
pub mod numeric;
pub mod object;
pub mod string;

use serde_json::Value;
use std::sync::Arc;

use crate::dispatch::KeywordContext;
use crate::error::{Result, ValidationError};
use crate::outcome::KeywordOutcome;
use crate::registry::{KeywordTable, Schema, SchemaScope, TypeDescriptor, TypeRegistry};

/// Behavior of a schema type
pub trait SchemaType: Send + Sync {
    /// Check the keywords this type owns in `schema`
    fn validate_schema(&self, schema: &Schema, scope: &SchemaScope<'_>) -> Result<()>;

    /// Gate run before any keyword; keywords only see data that passes
    fn check_data(&self, data: &Value, ctx: &KeywordContext<'_>) -> KeywordOutcome;

    /// Keyword validators seeded into a new descriptor
    fn keywords(&self) -> KeywordTable;

    /// Fill in implied keyword values
    fn normalize(&self, _schema: &mut Schema) {}

    /// Nested schemas as `(location, schema)` pairs
    ///
    /// Locations are the keys keyword validators pass to
    /// [`KeywordContext::validate_child`].
    fn subschemas<'s>(&self, _schema: &'s Schema) -> Vec<(String, &'s Value)> {
        Vec::new()
    }

    /// Regular expressions used while validating data
    fn patterns(&self, _schema: &Schema) -> Vec<String> {
        Vec::new()
    }
}

/// Register the generic types
pub(crate) fn register_builtin(registry: &mut TypeRegistry) {
    registry.register(TypeDescriptor::new("string", Arc::new(string::StringType)));
    registry.register(TypeDescriptor::new("numeric", Arc::new(numeric::NumericType)));
    registry.register(TypeDescriptor::new("boolean", Arc::new(boolean::BooleanType)));
    registry.register(TypeDescriptor::new("array", Arc::new(array::ArrayType)));
    registry.register(TypeDescriptor::new("object", Arc::new(object::ObjectType)));

    let numeric = TypeDescriptor::new("numeric", Arc::new(numeric::NumericType));
    registry.register(numeric.renamed("number"));
    registry.register(numeric.refined("integer", Arc::new(numeric::check_integer)));
}

/// `enum`: data must equal one of the listed values
pub(crate) fn enumeration(
    value: &Value,
    data: &Value,
    _ctx: &KeywordContext<'_>,
) -> KeywordOutcome {
    let Some(allowed) = value.as_array() else {
        return KeywordOutcome::Valid;
    };

    if allowed.iter().any(|candidate| checks::json_equal(candidate, data)) {
        KeywordOutcome::Valid
    } else {
        ValidationError::message("data must be one of the enumerated values")
            .with_detail("allowed", value.clone())
            .into()
    }
}
