//! `numeric` type and its `integer` refinement
//!
//! `multipleOf` uses exact integer arithmetic when both operands are
//! integers. For floats the remainder is computed in binary floating point,
//! so a divisor such as `0.1` is not represented exactly.

use serde_json::Value;

use super::checks::{self, ItemKind};
use super::SchemaType;
use crate::dispatch::KeywordContext;
use crate::error::{Result, SchemaError, ValidationError};
use crate::outcome::KeywordOutcome;
use crate::registry::{KeywordTable, Schema, SchemaScope};

/// The generic number type
pub struct NumericType;

impl SchemaType for NumericType {
    fn validate_schema(&self, schema: &Schema, scope: &SchemaScope<'_>) -> Result<()> {
        if let Some(value) = schema.get("enum") {
            checks::unique_list(value, "enum", ItemKind::Number, scope)?;
        }
        checks::number(schema, "maximum")?;
        checks::boolean(schema, "exclusiveMaximum")?;
        checks::number(schema, "minimum")?;
        checks::boolean(schema, "exclusiveMinimum")?;

        if let Some(value) = schema.get("multipleOf") {
            let divisor = checks::as_wide_integer(value)
                .ok_or_else(|| SchemaError::invalid_schema("multipleOf must be an integer"))?;
            if divisor <= 0 {
                return Err(SchemaError::invalid_schema(
                    "multipleOf must be strictly greater than 0",
                ));
            }
        }
        Ok(())
    }

    fn check_data(&self, data: &Value, _ctx: &KeywordContext<'_>) -> KeywordOutcome {
        data.is_number().into()
    }

    fn keywords(&self) -> KeywordTable {
        KeywordTable::new()
            .with("enum", super::enumeration)
            .with("maximum", maximum)
            .with("minimum", minimum)
            .with("multipleOf", multiple_of)
    }

    fn normalize(&self, schema: &mut Schema) {
        for key in ["exclusiveMaximum", "exclusiveMinimum"] {
            schema.entry(key).or_insert(Value::Bool(false));
        }
    }
}

/// Data check of `integer`, run after the `numeric` one
pub(crate) fn check_integer(data: &Value, _ctx: &KeywordContext<'_>) -> KeywordOutcome {
    let whole = data.is_i64()
        || data.is_u64()
        || data.as_f64().map_or(false, |f| f.is_finite() && f.fract() == 0.0);

    if whole {
        KeywordOutcome::Valid
    } else {
        ValidationError::new("type", "data must be an integer").into()
    }
}

fn exclusive(ctx: &KeywordContext<'_>, key: &str) -> bool {
    ctx.schema().get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn maximum(value: &Value, data: &Value, ctx: &KeywordContext<'_>) -> KeywordOutcome {
    let (Some(n), Some(max)) = (data.as_f64(), value.as_f64()) else {
        return KeywordOutcome::Valid;
    };
    let strict = exclusive(ctx, "exclusiveMaximum");

    if (strict && n >= max) || n > max {
        let message = if strict {
            format!("data must be strictly less than {}", value)
        } else {
            format!("data must be less than, or equal to, {}", value)
        };
        ValidationError::message(message)
            .with_detail("maximum", value.clone())
            .with_detail("exclusiveMaximum", strict)
            .into()
    } else {
        KeywordOutcome::Valid
    }
}

fn minimum(value: &Value, data: &Value, ctx: &KeywordContext<'_>) -> KeywordOutcome {
    let (Some(n), Some(min)) = (data.as_f64(), value.as_f64()) else {
        return KeywordOutcome::Valid;
    };
    let strict = exclusive(ctx, "exclusiveMinimum");

    if (strict && n <= min) || n < min {
        let message = if strict {
            format!("data must be strictly greater than {}", value)
        } else {
            format!("data must be greater than, or equal to, {}", value)
        };
        ValidationError::message(message)
            .with_detail("minimum", value.clone())
            .with_detail("exclusiveMinimum", strict)
            .into()
    } else {
        KeywordOutcome::Valid
    }
}

fn multiple_of(value: &Value, data: &Value, _ctx: &KeywordContext<'_>) -> KeywordOutcome {
    let divides = match (checks::as_wide_integer(data), checks::as_wide_integer(value)) {
        (Some(n), Some(d)) if d != 0 => n % d == 0,
        _ => match (data.as_f64(), value.as_f64()) {
            (Some(n), Some(d)) if d != 0.0 => n % d == 0.0,
            _ => true,
        },
    };

    if divides {
        KeywordOutcome::Valid
    } else {
        ValidationError::message(format!("data must be a multiple of {}", value))
            .with_detail("multipleOf", value.clone())
            .into()
    }
}
