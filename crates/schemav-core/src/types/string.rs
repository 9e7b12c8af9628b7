//! `string` type
//!
//! Accepts strings and `null`. Length keywords count characters, not bytes,
//! and ignore `null`; `required: true` rejects both `null` and `""`.

use regex::Regex;
use serde_json::Value;

use super::checks::{self, ItemKind};
use super::SchemaType;
use crate::dispatch::KeywordContext;
use crate::error::{Result, SchemaError, ValidationError};
use crate::formats;
use crate::outcome::KeywordOutcome;
use crate::registry::{KeywordTable, Schema, SchemaScope};

/// The generic string type
pub struct StringType;

impl SchemaType for StringType {
    fn validate_schema(&self, schema: &Schema, scope: &SchemaScope<'_>) -> Result<()> {
        if let Some(value) = schema.get("enum") {
            checks::unique_list(value, "enum", ItemKind::String, scope)?;
        }
        checks::non_negative_integer(schema, "maxLength")?;
        checks::non_negative_integer(schema, "minLength")?;
        if let Some(pattern) = checks::string(schema, "pattern")? {
            checks::regex(pattern)?;
        }
        if let Some(format) = checks::string(schema, "format")? {
            if !formats::is_known(format) {
                return Err(SchemaError::invalid_schema(format!("Unknown format '{}'", format)));
            }
        }
        checks::boolean(schema, "required")
    }

    fn check_data(&self, data: &Value, _ctx: &KeywordContext<'_>) -> KeywordOutcome {
        (data.is_string() || data.is_null()).into()
    }

    fn keywords(&self) -> KeywordTable {
        KeywordTable::new()
            .with("enum", super::enumeration)
            .with("maxLength", max_length)
            .with("minLength", min_length)
            .with("pattern", pattern)
            .with("format", format)
            .with("required", required)
    }

    fn patterns(&self, schema: &Schema) -> Vec<String> {
        schema
            .get("pattern")
            .and_then(Value::as_str)
            .map(|p| vec![p.to_string()])
            .unwrap_or_default()
    }
}

fn length(data: &Value) -> Option<usize> {
    data.as_str().map(|s| s.chars().count())
}

fn max_length(value: &Value, data: &Value, _ctx: &KeywordContext<'_>) -> KeywordOutcome {
    match (length(data), checks::as_count(value)) {
        (Some(size), Some(max)) if size as u64 > max => ValidationError::message(format!(
            "too many characters. must be less than, or equal to, {}",
            max
        ))
        .with_detail("size", size)
        .with_detail("maxLength", max)
        .into(),
        _ => KeywordOutcome::Valid,
    }
}

fn min_length(value: &Value, data: &Value, _ctx: &KeywordContext<'_>) -> KeywordOutcome {
    match (length(data), checks::as_count(value)) {
        (Some(size), Some(min)) if (size as u64) < min => ValidationError::message(format!(
            "not enough characters. must be greater than, or equal to, {}",
            min
        ))
        .with_detail("size", size)
        .with_detail("minLength", min)
        .into(),
        _ => KeywordOutcome::Valid,
    }
}

fn pattern(value: &Value, data: &Value, ctx: &KeywordContext<'_>) -> KeywordOutcome {
    let (Some(text), Some(pattern)) = (data.as_str(), value.as_str()) else {
        return KeywordOutcome::Valid;
    };

    let matched = match ctx.regex(pattern) {
        Some(re) => re.is_match(text),
        None => Regex::new(pattern).map(|re| re.is_match(text)).unwrap_or(false),
    };

    if matched {
        KeywordOutcome::Valid
    } else {
        ValidationError::message(format!("data does not match the pattern {}", pattern))
            .with_detail("pattern", pattern)
            .into()
    }
}

fn format(value: &Value, data: &Value, _ctx: &KeywordContext<'_>) -> KeywordOutcome {
    let (Some(text), Some(name)) = (data.as_str(), value.as_str()) else {
        return KeywordOutcome::Valid;
    };

    match formats::check(name, text) {
        Some(true) => KeywordOutcome::Valid,
        Some(false) => ValidationError::message(format!("data must be a valid {}", name))
            .with_detail("format", name)
            .into(),
        None => KeywordOutcome::reject(format!("Unknown format '{}'", name)),
    }
}

fn required(value: &Value, data: &Value, _ctx: &KeywordContext<'_>) -> KeywordOutcome {
    if value.as_bool() != Some(true) {
        return KeywordOutcome::Valid;
    }
    match data.as_str() {
        Some(text) if !text.is_empty() => KeywordOutcome::Valid,
        _ => KeywordOutcome::reject("a value is required"),
    }
}
