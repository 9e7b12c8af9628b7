//! `array` type
//!
//! `items` is either one schema for every element or a tuple of schemas
//! matched by position. Elements past the tuple are governed by
//! `additionalItems`.

use serde_json::Value;

use super::checks::{self, ItemKind};
use super::SchemaType;
use crate::dispatch::KeywordContext;
use crate::error::{Result, SchemaError, ValidationError};
use crate::outcome::{gather, KeywordOutcome, Report};
use crate::registry::{KeywordTable, Schema, SchemaScope};

/// The generic array type
pub struct ArrayType;

impl SchemaType for ArrayType {
    fn validate_schema(&self, schema: &Schema, scope: &SchemaScope<'_>) -> Result<()> {
        match schema.get("additionalItems") {
            None | Some(Value::Bool(_)) => {}
            Some(Value::Null) => {
                return Err(SchemaError::invalid_schema("additionalItems cannot be null"))
            }
            Some(value @ Value::Object(_)) => scope.validate_nested(value, "An additional item")?,
            Some(_) => {
                return Err(SchemaError::invalid_schema(
                    "additionalItems must be either a boolean or an object",
                ))
            }
        }

        match schema.get("items") {
            None => {}
            Some(Value::Null) => return Err(SchemaError::invalid_schema("items cannot be null")),
            Some(value @ Value::Array(_)) => {
                checks::unique_list(value, "items", ItemKind::Schema, scope)?;
            }
            Some(value) => scope.validate_nested(value, "A item entry")?,
        }

        checks::non_negative_integer(schema, "maxItems")?;
        checks::non_negative_integer(schema, "minItems")?;
        checks::boolean(schema, "uniqueItems")
    }

    fn check_data(&self, data: &Value, _ctx: &KeywordContext<'_>) -> KeywordOutcome {
        data.is_array().into()
    }

    fn keywords(&self) -> KeywordTable {
        KeywordTable::new()
            .with("items", items)
            .with("additionalItems", additional_items)
            .with("maxItems", max_items)
            .with("minItems", min_items)
            .with("uniqueItems", unique_items)
    }

    fn normalize(&self, schema: &mut Schema) {
        schema.entry("uniqueItems").or_insert(Value::Bool(false));
    }

    fn subschemas<'s>(&self, schema: &'s Schema) -> Vec<(String, &'s Value)> {
        let mut nested = Vec::new();
        match schema.get("items") {
            Some(Value::Array(tuple)) => {
                for (i, item) in tuple.iter().enumerate() {
                    nested.push((format!("items/{}", i), item));
                }
            }
            Some(item @ Value::Object(_)) => nested.push(("items".to_string(), item)),
            _ => {}
        }
        if let Some(extra @ Value::Object(_)) = schema.get("additionalItems") {
            nested.push(("additionalItems".to_string(), extra));
        }
        nested
    }
}

/// One record per failing element, carrying its position
fn indexed(
    keyword: &'static str,
    message: &'static str,
    positions: Vec<usize>,
) -> impl FnOnce(Vec<Vec<ValidationError>>) -> KeywordOutcome + Send + 'static {
    move |lists: Vec<Vec<ValidationError>>| {
        let failed: Vec<ValidationError> = positions
            .into_iter()
            .zip(lists)
            .filter(|(_, errors)| !errors.is_empty())
            .map(|(index, errors)| {
                ValidationError::new(keyword, message)
                    .with_index(index)
                    .with_errors(errors)
            })
            .collect();
        KeywordOutcome::from(failed)
    }
}

fn items(value: &Value, data: &Value, ctx: &KeywordContext<'_>) -> KeywordOutcome {
    let Some(list) = data.as_array() else {
        return KeywordOutcome::Valid;
    };

    let (positions, reports): (Vec<usize>, Vec<Report>) = match value {
        Value::Array(tuple) => list
            .iter()
            .take(tuple.len())
            .enumerate()
            .map(|(i, item)| {
                (i, ctx.validate_child(&format!("items/{}", i), &i.to_string(), Some(item)))
            })
            .unzip(),
        Value::Object(_) => list
            .iter()
            .enumerate()
            .map(|(i, item)| (i, ctx.validate_child("items", &i.to_string(), Some(item))))
            .unzip(),
        _ => return KeywordOutcome::Valid,
    };

    gather(reports, indexed("items", "invalid item", positions))
}

fn additional_items(value: &Value, data: &Value, ctx: &KeywordContext<'_>) -> KeywordOutcome {
    let (Some(list), Some(tuple)) = (
        data.as_array(),
        ctx.schema().get("items").and_then(Value::as_array),
    ) else {
        return KeywordOutcome::Valid;
    };
    if list.len() <= tuple.len() {
        return KeywordOutcome::Valid;
    }

    match value {
        Value::Bool(false) => ValidationError::message(format!(
            "the size of data must be less than, or equal to, {}",
            tuple.len()
        ))
        .with_detail("size", list.len())
        .into(),
        Value::Object(_) => {
            let (positions, reports): (Vec<usize>, Vec<Report>) = list
                .iter()
                .enumerate()
                .skip(tuple.len())
                .map(|(i, item)| {
                    (i, ctx.validate_child("additionalItems", &i.to_string(), Some(item)))
                })
                .unzip();
            gather(reports, indexed("additionalItems", "invalid additional item", positions))
        }
        _ => KeywordOutcome::Valid,
    }
}

fn max_items(value: &Value, data: &Value, _ctx: &KeywordContext<'_>) -> KeywordOutcome {
    match (data.as_array(), checks::as_count(value)) {
        (Some(list), Some(max)) if list.len() as u64 > max => ValidationError::message(format!(
            "too many items. must be less than, or equal to, {}",
            max
        ))
        .with_detail("size", list.len())
        .with_detail("maxItems", max)
        .into(),
        _ => KeywordOutcome::Valid,
    }
}

fn min_items(value: &Value, data: &Value, _ctx: &KeywordContext<'_>) -> KeywordOutcome {
    match (data.as_array(), checks::as_count(value)) {
        (Some(list), Some(min)) if (list.len() as u64) < min => ValidationError::message(format!(
            "not enough items. must be greater than, or equal to, {}",
            min
        ))
        .with_detail("size", list.len())
        .with_detail("minItems", min)
        .into(),
        _ => KeywordOutcome::Valid,
    }
}

fn unique_items(value: &Value, data: &Value, _ctx: &KeywordContext<'_>) -> KeywordOutcome {
    let (Some(true), Some(list)) = (value.as_bool(), data.as_array()) else {
        return KeywordOutcome::Valid;
    };

    let repeated = checks::duplicates(list);
    if repeated.is_empty() {
        KeywordOutcome::Valid
    } else {
        ValidationError::message("data must not contain duplicate items")
            .with_detail("duplicates", repeated)
            .into()
    }
}
