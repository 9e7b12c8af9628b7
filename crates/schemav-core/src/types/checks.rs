//! Shape checks shared by the generic types

use regex::Regex;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::fmt::Write;

use crate::error::{Result, SchemaError};
use crate::registry::{Schema, SchemaScope};

/// What a list-valued keyword must contain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    String,
    Number,
    Boolean,
    /// Any JSON value
    Value,
    /// Nested schemas, meta-validated through the scope
    Schema,
}

impl ItemKind {
    fn label(self) -> &'static str {
        match self {
            ItemKind::String => "string",
            ItemKind::Number => "number",
            ItemKind::Boolean => "boolean",
            ItemKind::Value => "value",
            ItemKind::Schema => "schema",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            ItemKind::String => value.is_string(),
            ItemKind::Number => value.is_number(),
            ItemKind::Boolean => value.is_boolean(),
            ItemKind::Value => true,
            ItemKind::Schema => value.is_object(),
        }
    }
}

/// Read a JSON number as an integer; floats with no fraction qualify
pub fn as_integer(value: &Value) -> Option<i64> {
    as_wide_integer(value).and_then(|n| i64::try_from(n).ok())
}

/// Read a JSON number as a count: a non-negative integer
pub fn as_count(value: &Value) -> Option<u64> {
    as_wide_integer(value).and_then(|n| u64::try_from(n).ok())
}

/// Read a JSON number as a wide integer, for exact arithmetic
pub fn as_wide_integer(value: &Value) -> Option<i128> {
    let Value::Number(n) = value else {
        return None;
    };
    match number_key(n) {
        NumberKey::Integer(n) => Some(n),
        NumberKey::Float(_) => None,
    }
}

/// Exact value of a JSON number
///
/// Integral numbers compare as integers whatever their representation, so
/// `1`, `1.0` and `u64::MAX` keep their exact values.
#[derive(Debug, Clone, Copy, PartialEq)]
enum NumberKey {
    Integer(i128),
    Float(f64),
}

fn number_key(n: &Number) -> NumberKey {
    if let Some(i) = n.as_i64() {
        return NumberKey::Integer(i128::from(i));
    }
    if let Some(u) = n.as_u64() {
        return NumberKey::Integer(i128::from(u));
    }
    match n.as_f64() {
        // Larger floats stay floats so the cast is exact
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e30 => {
            NumberKey::Integer(f as i128)
        }
        Some(f) => NumberKey::Float(f),
        None => NumberKey::Float(f64::NAN),
    }
}

/// Equality where `1` and `1.0` are the same number
pub fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => number_key(x) == number_key(y),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| json_equal(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.get(k).map_or(false, |w| json_equal(v, w)))
        }
        _ => a == b,
    }
}

/// Append a key that is equal for values `json_equal` treats as equal
fn canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push('n'),
        Value::Bool(b) => out.push(if *b { 't' } else { 'f' }),
        Value::Number(n) => match number_key(n) {
            NumberKey::Integer(i) => {
                let _ = write!(out, "i{};", i);
            }
            NumberKey::Float(f) => {
                let _ = write!(out, "d{:e};", f);
            }
        },
        Value::String(s) => {
            let _ = write!(out, "s{}:{}", s.len(), s);
        }
        Value::Array(items) => {
            out.push('[');
            for item in items {
                canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(members) => {
            let mut keys: Vec<&String> = members.keys().collect();
            keys.sort_unstable();
            out.push('{');
            for key in keys {
                let _ = write!(out, "{}:{}", key.len(), key);
                canonical(&members[key.as_str()], out);
            }
            out.push('}');
        }
    }
}

/// Positions of values already seen earlier in the list
pub fn duplicates(values: &[Value]) -> Vec<usize> {
    let mut seen: HashMap<String, Vec<usize>> = HashMap::with_capacity(values.len());
    let mut repeated = Vec::new();

    for (i, value) in values.iter().enumerate() {
        let mut key = String::new();
        canonical(value, &mut key);

        let bucket = seen.entry(key).or_default();
        if bucket.iter().any(|&j| json_equal(&values[j], value)) {
            repeated.push(i);
        } else {
            bucket.push(i);
        }
    }

    repeated
}

/// `key`, if present, must be a non-negative integer
pub fn non_negative_integer(schema: &Schema, key: &str) -> Result<()> {
    let Some(value) = schema.get(key) else {
        return Ok(());
    };
    if as_count(value).is_some() {
        return Ok(());
    }
    match as_wide_integer(value) {
        Some(_) => Err(SchemaError::invalid_schema(format!(
            "{} must be greater than, or equal to, 0",
            key
        ))),
        None => Err(SchemaError::invalid_schema(format!("{} must be an integer", key))),
    }
}

/// `key`, if present, must be a boolean
pub fn boolean(schema: &Schema, key: &str) -> Result<()> {
    match schema.get(key) {
        None | Some(Value::Bool(_)) => Ok(()),
        Some(_) => Err(SchemaError::invalid_schema(format!("{} must be a boolean", key))),
    }
}

/// `key`, if present, must be a number
pub fn number(schema: &Schema, key: &str) -> Result<()> {
    match schema.get(key) {
        None | Some(Value::Number(_)) => Ok(()),
        Some(_) => Err(SchemaError::invalid_schema(format!("{} must be a number", key))),
    }
}

/// `key`, if present, must be a string
pub fn string<'s>(schema: &'s Schema, key: &str) -> Result<Option<&'s str>> {
    match schema.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(SchemaError::invalid_schema(format!("{} must be a string", key))),
    }
}

/// A value that must be an object; null gets its own message
pub fn object<'v>(value: &'v Value, label: &str, expected: &str) -> Result<&'v Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Err(SchemaError::invalid_schema(format!("{} cannot be null", label))),
        _ => Err(SchemaError::invalid_schema(format!("{} must be {}", label, expected))),
    }
}

/// A non-empty array of unique items of one kind
pub fn unique_list<'v>(
    value: &'v Value,
    label: &str,
    kind: ItemKind,
    scope: &SchemaScope<'_>,
) -> Result<&'v [Value]> {
    let items = value
        .as_array()
        .ok_or_else(|| SchemaError::invalid_schema(format!("{} must be an array", label)))?;

    if items.is_empty() {
        return Err(SchemaError::invalid_schema(format!(
            "{} must have at least one element",
            label
        )));
    }

    for item in items {
        if !kind.accepts(item) {
            return Err(SchemaError::invalid_schema(format!(
                "{} must be a list of {}",
                label,
                kind.label()
            )));
        }
        if kind == ItemKind::Schema {
            scope.validate_nested(item, label)?;
        }
    }

    if !duplicates(items).is_empty() {
        return Err(SchemaError::invalid_schema(format!(
            "{} must be a list of unique {}",
            label,
            kind.label()
        )));
    }

    Ok(items)
}

/// Compile a pattern, reporting syntax errors as schema errors
pub fn regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| SchemaError::invalid_schema(format!("Invalid regular expression: {}", e)))
}
