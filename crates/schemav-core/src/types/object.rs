//! `object` type
//!
//! A member is covered when it is declared in `properties` or matches any
//! `patternProperties` pattern; `additionalProperties` governs the rest.
//! Patterns only apply to members not declared in `properties`, and every
//! matching pattern applies.

use serde_json::{Map, Value};

use super::checks::{self, ItemKind};
use super::SchemaType;
use crate::dispatch::KeywordContext;
use crate::error::{Result, SchemaError, ValidationError};
use crate::outcome::{gather, KeywordOutcome, Report};
use crate::registry::{KeywordTable, Schema, SchemaScope};

/// The generic object type
pub struct ObjectType;

impl SchemaType for ObjectType {
    fn validate_schema(&self, schema: &Schema, scope: &SchemaScope<'_>) -> Result<()> {
        checks::non_negative_integer(schema, "maxProperties")?;
        checks::non_negative_integer(schema, "minProperties")?;

        let properties = match schema.get("properties") {
            Some(value) => {
                let properties = checks::object(value, "properties", "an object")?;
                for entry in properties.values() {
                    checks::object(entry, "A property entry", "a JSON Schema")?;
                    scope.validate_nested(entry, "A property entry")?;
                }
                Some(properties)
            }
            None => None,
        };

        if let Some(value) = schema.get("required") {
            let required = checks::unique_list(value, "required", ItemKind::String, scope)?;
            declared(properties, required.iter().filter_map(Value::as_str))?;
        }

        if let Some(value) = schema.get("patternProperties") {
            let patterns = checks::object(value, "patternProperties", "an object")?;
            for (pattern, entry) in patterns {
                checks::regex(pattern)?;
                checks::object(entry, "A property entry", "a JSON Schema")?;
                scope.validate_nested(entry, "A property entry")?;
            }
        }

        match schema.get("additionalProperties") {
            None | Some(Value::Bool(_)) => {}
            Some(Value::Null) => {
                return Err(SchemaError::invalid_schema("additionalProperties cannot be null"))
            }
            Some(value @ Value::Object(_)) => scope.validate_nested(value, "additionalProperties")?,
            Some(_) => {
                return Err(SchemaError::invalid_schema(
                    "additionalProperties must be a boolean or a schema",
                ))
            }
        }

        if let Some(value) = schema.get("dependencies") {
            let dependencies = checks::object(value, "dependencies", "an object")?;
            for (property, dependency) in dependencies {
                declared(properties, [property.as_str()])?;

                if dependency.is_array() {
                    let list = checks::unique_list(
                        dependency,
                        "A dependency entry",
                        ItemKind::String,
                        scope,
                    )?;
                    declared(properties, list.iter().filter_map(Value::as_str))?;
                    continue;
                }

                let entry = checks::object(dependency, "A dependency entry", "an object")?;
                if entry.contains_key("type") {
                    scope.validate_nested(dependency, "A dependency entry")?;
                } else {
                    let mut typed = entry.clone();
                    typed.insert("type".to_string(), Value::from("object"));
                    scope.validate_nested(&Value::Object(typed), "A dependency entry")?;
                }
            }
        }

        Ok(())
    }

    fn check_data(&self, data: &Value, _ctx: &KeywordContext<'_>) -> KeywordOutcome {
        data.is_object().into()
    }

    fn keywords(&self) -> KeywordTable {
        KeywordTable::new()
            .with("properties", properties)
            .with("patternProperties", pattern_properties)
            .with("additionalProperties", additional_properties)
            .with("required", required)
            .with("maxProperties", max_properties)
            .with("minProperties", min_properties)
            .with("dependencies", dependencies)
    }

    fn normalize(&self, schema: &mut Schema) {
        if let Some(Value::Object(dependencies)) = schema.get_mut("dependencies") {
            for dependency in dependencies.values_mut() {
                if let Value::Object(entry) = dependency {
                    entry
                        .entry("type")
                        .or_insert_with(|| Value::from("object"));
                }
            }
        }
    }

    fn subschemas<'s>(&self, schema: &'s Schema) -> Vec<(String, &'s Value)> {
        let mut nested = Vec::new();
        for (keyword, value) in schema {
            match (keyword.as_str(), value) {
                ("properties" | "patternProperties" | "dependencies", Value::Object(entries)) => {
                    for (key, entry) in entries {
                        if entry.is_object() {
                            nested.push((format!("{}/{}", keyword, key), entry));
                        }
                    }
                }
                ("additionalProperties", Value::Object(_)) => {
                    nested.push(("additionalProperties".to_string(), value));
                }
                _ => {}
            }
        }
        nested
    }

    fn patterns(&self, schema: &Schema) -> Vec<String> {
        schema
            .get("patternProperties")
            .and_then(Value::as_object)
            .map(|patterns| patterns.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Every name must be declared in `properties`
fn declared<'n>(
    properties: Option<&Map<String, Value>>,
    names: impl IntoIterator<Item = &'n str>,
) -> Result<()> {
    let properties =
        properties.ok_or_else(|| SchemaError::invalid_schema("Missing properties entry"))?;
    for name in names {
        if !properties.contains_key(name) {
            return Err(SchemaError::invalid_schema(format!("Missing '{}' property", name)));
        }
    }
    Ok(())
}

/// One record per failing member, carrying its name
fn named(
    keyword: &'static str,
    message: &'static str,
    names: Vec<String>,
) -> impl FnOnce(Vec<Vec<ValidationError>>) -> KeywordOutcome + Send + 'static {
    move |lists: Vec<Vec<ValidationError>>| {
        let failed: Vec<ValidationError> = names
            .into_iter()
            .zip(lists)
            .filter(|(_, errors)| !errors.is_empty())
            .map(|(name, errors)| {
                ValidationError::new(keyword, message)
                    .with_prop(name)
                    .with_errors(errors)
            })
            .collect();
        KeywordOutcome::from(failed)
    }
}

fn declared_in(ctx: &KeywordContext<'_>, key: &str) -> bool {
    ctx.schema()
        .get("properties")
        .and_then(Value::as_object)
        .map_or(false, |properties| properties.contains_key(key))
}

fn matching_patterns<'c>(ctx: &KeywordContext<'c>, key: &str) -> Vec<&'c str> {
    ctx.schema()
        .get("patternProperties")
        .and_then(Value::as_object)
        .map(|patterns| {
            patterns
                .keys()
                .filter(|pattern| ctx.regex(pattern).map_or(false, |re| re.is_match(key)))
                .map(String::as_str)
                .collect()
        })
        .unwrap_or_default()
}

fn properties(value: &Value, data: &Value, ctx: &KeywordContext<'_>) -> KeywordOutcome {
    let (Some(schemas), Some(members)) = (value.as_object(), data.as_object()) else {
        return KeywordOutcome::Valid;
    };

    let mut names = Vec::new();
    let mut reports = Vec::new();
    for (name, schema) in schemas {
        let location = format!("properties/{}", name);
        match members.get(name) {
            Some(member) => reports.push(ctx.validate_child(&location, name, Some(member))),
            // Absent members are only checked when they must be present
            None if demands_value(schema) => {
                reports.push(ctx.validate_child(&location, name, None))
            }
            None => continue,
        }
        names.push(name.clone());
    }

    gather(reports, named("properties", "invalid property", names))
}

fn demands_value(schema: &Value) -> bool {
    schema.get("required").and_then(Value::as_bool) == Some(true) && schema.get("default").is_none()
}

fn pattern_properties(_value: &Value, data: &Value, ctx: &KeywordContext<'_>) -> KeywordOutcome {
    let Some(members) = data.as_object() else {
        return KeywordOutcome::Valid;
    };

    let mut names = Vec::new();
    let mut reports = Vec::new();
    for (name, member) in members {
        if declared_in(ctx, name) {
            continue;
        }
        for pattern in matching_patterns(ctx, name) {
            let location = format!("patternProperties/{}", pattern);
            reports.push(ctx.validate_child(&location, name, Some(member)));
            names.push(name.clone());
        }
    }

    gather(reports, named("patternProperties", "invalid property", names))
}

fn additional_properties(value: &Value, data: &Value, ctx: &KeywordContext<'_>) -> KeywordOutcome {
    let Some(members) = data.as_object() else {
        return KeywordOutcome::Valid;
    };

    let uncovered: Vec<(&String, &Value)> = members
        .iter()
        .filter(|(name, _)| !declared_in(ctx, name) && matching_patterns(ctx, name).is_empty())
        .collect();

    match value {
        Value::Bool(false) if !uncovered.is_empty() => {
            let names: Vec<Value> = uncovered
                .iter()
                .map(|(name, _)| Value::from(name.as_str()))
                .collect();
            ValidationError::message("no additional properties")
                .with_detail("properties", names)
                .into()
        }
        Value::Object(_) => {
            let names: Vec<String> = uncovered.iter().map(|(name, _)| name.to_string()).collect();
            let reports: Vec<Report> = uncovered
                .iter()
                .map(|(name, member)| {
                    ctx.validate_child("additionalProperties", name.as_str(), Some(*member))
                })
                .collect();
            gather(reports, named("additionalProperties", "invalid additional property", names))
        }
        _ => KeywordOutcome::Valid,
    }
}

fn required(value: &Value, data: &Value, _ctx: &KeywordContext<'_>) -> KeywordOutcome {
    let (Some(names), Some(members)) = (value.as_array(), data.as_object()) else {
        return KeywordOutcome::Valid;
    };

    let missing: Vec<Value> = names
        .iter()
        .filter(|name| name.as_str().map_or(false, |name| !members.contains_key(name)))
        .cloned()
        .collect();

    if missing.is_empty() {
        KeywordOutcome::Valid
    } else {
        ValidationError::message("missing required fields")
            .with_detail("required", missing)
            .into()
    }
}

fn max_properties(value: &Value, data: &Value, _ctx: &KeywordContext<'_>) -> KeywordOutcome {
    match (data.as_object(), checks::as_count(value)) {
        (Some(members), Some(max)) if members.len() as u64 > max => {
            ValidationError::message(format!(
                "too many properties. must be less than, or equal to, {}",
                max
            ))
            .with_detail("size", members.len())
            .with_detail("maxProperties", max)
            .into()
        }
        _ => KeywordOutcome::Valid,
    }
}

fn min_properties(value: &Value, data: &Value, _ctx: &KeywordContext<'_>) -> KeywordOutcome {
    match (data.as_object(), checks::as_count(value)) {
        (Some(members), Some(min)) if (members.len() as u64) < min => {
            ValidationError::message(format!(
                "not enough properties. must be greater than, or equal to, {}",
                min
            ))
            .with_detail("size", members.len())
            .with_detail("minProperties", min)
            .into()
        }
        _ => KeywordOutcome::Valid,
    }
}

fn dependencies(value: &Value, data: &Value, ctx: &KeywordContext<'_>) -> KeywordOutcome {
    let (Some(dependencies), Some(members)) = (value.as_object(), data.as_object()) else {
        return KeywordOutcome::Valid;
    };

    let mut reports = Vec::new();
    for (property, dependency) in dependencies {
        if !members.contains_key(property) {
            continue;
        }
        match dependency {
            Value::Array(names) => {
                let missing = names
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|name| !members.contains_key(*name))
                    .map(|name| {
                        let message = format!("'{}' requires '{}'", property, name);
                        ValidationError::new("dependencies", message)
                            .with_prop(property.as_str())
                            .with_detail("required", name)
                    })
                    .collect();
                reports.push(Report::Ready(missing));
            }
            _ => reports.push(ctx.validate_child(
                &format!("dependencies/{}", property),
                "",
                Some(data),
            )),
        }
    }

    gather(reports, |lists| {
        let missing: Vec<ValidationError> = lists.into_iter().flatten().collect();
        if missing.is_empty() {
            KeywordOutcome::Valid
        } else {
            ValidationError::message("there are some missing dependencies")
                .with_errors(missing)
                .into()
        }
    })
}
