//! Schema compilation
//!
//! Compiling meta-validates the whole schema tree, then builds a
//! [`SchemaNode`] per schema, bottom-up. Each node is normalized by its
//! type and the type's compile steps, owns its compiled child nodes and
//! regular expressions, and has its `default` checked against itself.
//!
//! Nodes are immutable and share one snapshot of the type registry, so a
//! [`Validator`] is unaffected by later registry edits and can be used from
//! many threads at once.

use futures::future::{join_all, BoxFuture};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::config::{EngineConfig, Mode};
use crate::dispatch;
use crate::error::{Result, SchemaError, ValidationError, ValidationErrors};
use crate::outcome::Report;
use crate::registry::{Schema, TypeDescriptor, TypeRegistry};
use crate::types::checks;

/// A compiled schema
pub struct SchemaNode {
    schema: Schema,
    type_name: String,
    descriptor: TypeDescriptor,
    children: HashMap<String, Arc<SchemaNode>>,
    regexes: HashMap<String, Regex>,
    types: Arc<TypeRegistry>,
    mode: Mode,
}

impl SchemaNode {
    /// Normalized schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Compiled nested schema at `location`
    pub fn child(&self, location: &str) -> Option<&Arc<SchemaNode>> {
        self.children.get(location)
    }

    pub fn regex(&self, pattern: &str) -> Option<&Regex> {
        self.regexes.get(pattern)
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }
}

impl fmt::Debug for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaNode")
            .field("type_name", &self.type_name)
            .field("schema", &self.schema)
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A default check that answered with a deferred result
struct DeferredDefault {
    value: Value,
    errors: BoxFuture<'static, Vec<ValidationError>>,
}

/// A compiled tree whose deferred default checks have not been awaited
pub(crate) struct Compilation {
    root: Arc<SchemaNode>,
    deferred: Vec<DeferredDefault>,
}

impl Compilation {
    /// Await the deferred default checks
    pub(crate) async fn finish(self) -> Result<Validator> {
        let (values, checks): (Vec<Value>, Vec<_>) = self
            .deferred
            .into_iter()
            .map(|d| (d.value, d.errors))
            .unzip();

        for (value, errors) in values.iter().zip(join_all(checks).await) {
            if !errors.is_empty() {
                return Err(SchemaError::invalid_default(value, errors));
            }
        }

        Ok(Validator { root: self.root })
    }

    /// Block on the deferred default checks
    pub(crate) fn finish_blocking(self) -> Result<Validator> {
        if self.deferred.is_empty() {
            return Ok(Validator { root: self.root });
        }
        futures::executor::block_on(self.finish())
    }
}

/// Compile `schema` against a registry snapshot
pub(crate) fn compile(
    types: Arc<TypeRegistry>,
    schema: &Value,
    config: &EngineConfig,
) -> Result<Compilation> {
    let root = types.validate_schema(schema, config.max_depth)?;

    let mut builder = Builder {
        types,
        mode: config.mode(),
        max_depth: config.max_depth,
        deferred: Vec::new(),
    };
    let root = builder.build(root, 0)?;

    debug!(
        type_name = root.type_name(),
        mode = %builder.mode,
        deferred_defaults = builder.deferred.len(),
        "Schema compiled"
    );

    Ok(Compilation {
        root,
        deferred: builder.deferred,
    })
}

/// Normalize `schema` and every schema nested in it, in place
pub(crate) fn normalize_tree(
    types: &TypeRegistry,
    schema: &mut Schema,
    depth: usize,
    max_depth: usize,
) -> Result<()> {
    if depth > max_depth {
        return Err(SchemaError::DepthExceeded(max_depth));
    }

    let type_name = schema
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| SchemaError::invalid_schema("schema.type must be a string"))?
        .to_string();
    let descriptor = types.lookup(&type_name)?;
    descriptor.normalize(schema)?;

    let locations: Vec<String> = descriptor
        .kind()
        .subschemas(schema)
        .into_iter()
        .map(|(location, _)| location)
        .collect();
    for location in locations {
        if let Some(Value::Object(nested)) = nested_mut(schema, &location) {
            normalize_tree(types, nested, depth + 1, max_depth)?;
        }
    }
    Ok(())
}

/// Resolve a subschema location such as `properties/name` or `items/0`
fn nested_mut<'s>(schema: &'s mut Schema, location: &str) -> Option<&'s mut Value> {
    let (keyword, key) = match location.split_once('/') {
        Some((keyword, key)) => (keyword, Some(key)),
        None => (location, None),
    };

    match (schema.get_mut(keyword)?, key) {
        (value, None) => Some(value),
        (Value::Array(items), Some(index)) => items.get_mut(index.parse::<usize>().ok()?),
        (Value::Object(entries), Some(key)) => entries.get_mut(key),
        _ => None,
    }
}

struct Builder {
    types: Arc<TypeRegistry>,
    mode: Mode,
    max_depth: usize,
    deferred: Vec<DeferredDefault>,
}

impl Builder {
    fn build(&mut self, mut schema: Schema, depth: usize) -> Result<Arc<SchemaNode>> {
        if depth > self.max_depth {
            return Err(SchemaError::DepthExceeded(self.max_depth));
        }

        let type_name = schema
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| SchemaError::invalid_schema("schema.type must be a string"))?
            .to_string();
        let descriptor = self.types.lookup(&type_name)?.clone();

        descriptor.normalize(&mut schema)?;

        let mut children = HashMap::new();
        for (location, nested) in descriptor.kind().subschemas(&schema) {
            let Some(nested) = nested.as_object() else {
                continue;
            };
            let child = self.build(nested.clone(), depth + 1)?;
            children.insert(location, child);
        }

        let mut regexes = HashMap::new();
        for pattern in descriptor.kind().patterns(&schema) {
            let re = checks::regex(&pattern)?;
            regexes.insert(pattern, re);
        }

        let node = Arc::new(SchemaNode {
            schema,
            type_name,
            descriptor,
            children,
            regexes,
            types: Arc::clone(&self.types),
            mode: self.mode,
        });

        self.check_default(&node)?;

        Ok(node)
    }

    fn check_default(&mut self, node: &Arc<SchemaNode>) -> Result<()> {
        let Some(value) = node.schema().get("default") else {
            return Ok(());
        };

        match dispatch::run(node, Some(value), String::new()) {
            Report::Ready(errors) if errors.is_empty() => Ok(()),
            Report::Ready(errors) => Err(SchemaError::invalid_default(value, errors)),
            Report::Pending(errors) => {
                self.deferred.push(DeferredDefault {
                    value: value.clone(),
                    errors,
                });
                Ok(())
            }
        }
    }
}

/// A compiled schema, ready to validate data
#[derive(Clone)]
pub struct Validator {
    root: Arc<SchemaNode>,
}

impl Validator {
    /// Normalized root schema
    pub fn schema(&self) -> &Schema {
        self.root.schema()
    }

    pub fn type_name(&self) -> &str {
        self.root.type_name()
    }

    pub fn mode(&self) -> Mode {
        self.root.mode()
    }

    /// Root node of the compiled tree
    pub fn root(&self) -> &Arc<SchemaNode> {
        &self.root
    }

    /// Start validating; `None` stands for absent data
    pub fn report(&self, data: Option<&Value>) -> Report {
        dispatch::run(&self.root, data, String::new())
    }

    /// Validate data, blocking on deferred results
    pub fn validate(&self, data: &Value) -> std::result::Result<(), ValidationErrors> {
        conclude(self.report(Some(data)).wait())
    }

    /// Validate absent data, blocking on deferred results
    pub fn validate_absent(&self) -> std::result::Result<(), ValidationErrors> {
        conclude(self.report(None).wait())
    }

    /// Validate data, awaiting deferred results
    pub async fn validate_async(&self, data: &Value) -> std::result::Result<(), ValidationErrors> {
        let report = self.report(Some(data));
        conclude(report.settle().await)
    }

    /// Validate absent data, awaiting deferred results
    pub async fn validate_absent_async(&self) -> std::result::Result<(), ValidationErrors> {
        let report = self.report(None);
        conclude(report.settle().await)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").field("root", &self.root).finish()
    }
}

fn conclude(errors: Vec<ValidationError>) -> std::result::Result<(), ValidationErrors> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors::new(errors))
    }
}
