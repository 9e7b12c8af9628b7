//! Type registry
//!
//! Maps type names to [`TypeDescriptor`]s. A descriptor bundles the type's
//! schema-shape rules, its data-shape gate, its keyword table and any
//! compile steps added by the user.
//!
//! Descriptors are plain values: registering an alias stores a copy, and a
//! compiled validator keeps its own snapshot of the registry. Later edits
//! never leak into either.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::dispatch::KeywordContext;
use crate::error::{Result, SchemaError};
use crate::outcome::KeywordOutcome;
use crate::types::{self, checks, SchemaType};

/// A schema document: a JSON object
pub type Schema = Map<String, Value>;

/// Keyword validator: `(keyword value, data, context)`
pub type KeywordFn =
    Arc<dyn Fn(&Value, &Value, &KeywordContext<'_>) -> KeywordOutcome + Send + Sync>;

/// Data-shape check for a type: `(data, context)`
pub type TypeCheckFn = Arc<dyn Fn(&Value, &KeywordContext<'_>) -> KeywordOutcome + Send + Sync>;

/// Schema transformation applied before a node is compiled
pub type CompileStepFn = Arc<dyn Fn(&mut Schema) -> Result<()> + Send + Sync>;

/// Keyword validators of one type, by keyword name
#[derive(Clone, Default)]
pub struct KeywordTable {
    entries: HashMap<String, KeywordFn>,
}

impl KeywordTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validator, returning the table
    pub fn with<F>(mut self, keyword: &str, validate: F) -> Self
    where
        F: Fn(&Value, &Value, &KeywordContext<'_>) -> KeywordOutcome + Send + Sync + 'static,
    {
        self.insert(keyword, Arc::new(validate));
        self
    }

    /// Add or replace a validator
    pub fn insert(&mut self, keyword: impl Into<String>, validate: KeywordFn) {
        self.entries.insert(keyword.into(), validate);
    }

    /// Remove a validator
    pub fn remove(&mut self, keyword: &str) -> Option<KeywordFn> {
        self.entries.remove(keyword)
    }

    /// Look up a validator
    pub fn get(&self, keyword: &str) -> Option<&KeywordFn> {
        self.entries.get(keyword)
    }

    /// Whether a validator is registered for `keyword`
    pub fn contains(&self, keyword: &str) -> bool {
        self.entries.contains_key(keyword)
    }

    /// Registered keyword names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for KeywordTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Everything the engine knows about one type
#[derive(Clone)]
pub struct TypeDescriptor {
    name: String,
    kind: Arc<dyn SchemaType>,
    keywords: KeywordTable,
    compile_steps: Vec<CompileStepFn>,
}

impl TypeDescriptor {
    /// Create a descriptor seeded with the type's own keyword table
    pub fn new(name: impl Into<String>, kind: Arc<dyn SchemaType>) -> Self {
        let keywords = kind.keywords();
        Self {
            name: name.into(),
            kind,
            keywords,
            compile_steps: Vec::new(),
        }
    }

    /// Name the descriptor is registered under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema and data shape rules
    pub fn kind(&self) -> &Arc<dyn SchemaType> {
        &self.kind
    }

    pub fn keywords(&self) -> &KeywordTable {
        &self.keywords
    }

    pub fn keywords_mut(&mut self) -> &mut KeywordTable {
        &mut self.keywords
    }

    /// Look up a keyword validator
    pub fn keyword(&self, keyword: &str) -> Option<&KeywordFn> {
        self.keywords.get(keyword)
    }

    /// Append a compile step
    pub fn add_compile_step(&mut self, step: CompileStepFn) {
        self.compile_steps.push(step);
    }

    pub fn compile_steps(&self) -> &[CompileStepFn] {
        &self.compile_steps
    }

    /// Apply built-in normalization, then the user's compile steps in order
    pub fn normalize(&self, schema: &mut Schema) -> Result<()> {
        self.kind.normalize(schema);
        for step in &self.compile_steps {
            step(schema)?;
        }
        Ok(())
    }

    /// Same descriptor under another name
    pub(crate) fn renamed(&self, name: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.name = name.into();
        copy
    }

    /// A new type that inherits this one's rules and adds a data check
    pub(crate) fn refined(&self, name: impl Into<String>, check: TypeCheckFn) -> Self {
        Self {
            name: name.into(),
            kind: Arc::new(types::custom::RefinedType::new(Arc::clone(&self.kind), check)),
            keywords: self.keywords.clone(),
            compile_steps: self.compile_steps.clone(),
        }
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("keywords", &self.keywords)
            .field("compile_steps", &self.compile_steps.len())
            .finish()
    }
}

/// Registered types by name
#[derive(Clone, Default, Debug)]
pub struct TypeRegistry {
    types: HashMap<String, TypeDescriptor>,
}

impl TypeRegistry {
    /// Create a registry without any type
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a registry holding the generic types
    pub fn with_builtin_types() -> Self {
        let mut registry = Self::empty();
        types::register_builtin(&mut registry);
        registry
    }

    /// Add or replace a descriptor under its own name
    pub fn register(&mut self, descriptor: TypeDescriptor) {
        self.types.insert(descriptor.name().to_string(), descriptor);
    }

    /// Remove a type; unknown names are ignored
    pub fn unregister(&mut self, name: &str) -> Option<TypeDescriptor> {
        self.types.remove(name)
    }

    /// Register a copy of `existing` under `alias`
    pub fn alias(&mut self, existing: &str, alias: &str) -> Result<()> {
        if alias.is_empty() {
            return Err(SchemaError::invalid_argument("alias must be a non-empty string"));
        }
        let copy = self.lookup(existing)?.renamed(alias);
        self.register(copy);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut TypeDescriptor> {
        self.types.get_mut(name)
    }

    /// Look up a type, failing with [`SchemaError::UnknownType`]
    pub fn lookup(&self, name: &str) -> Result<&TypeDescriptor> {
        self.types.get(name).ok_or_else(|| SchemaError::unknown_type(name))
    }

    /// Look up a type for modification
    pub fn lookup_mut(&mut self, name: &str) -> Result<&mut TypeDescriptor> {
        self.types.get_mut(name).ok_or_else(|| SchemaError::unknown_type(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered type names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Meta-validate a root schema and return a copy of it
    pub fn validate_schema(&self, schema: &Value, max_depth: usize) -> Result<Schema> {
        let map = schema
            .as_object()
            .ok_or_else(|| SchemaError::invalid_schema("schema must be an object"))?;

        let type_name = match map.get("type") {
            Some(Value::String(name)) => name,
            _ => return Err(SchemaError::invalid_schema("schema.type must be a string")),
        };

        let descriptor = self.lookup(type_name)?;
        SchemaScope::new(self, max_depth).check(descriptor, map)?;

        Ok(map.clone())
    }
}

/// Position of a schema being meta-validated
///
/// Handed to [`SchemaType::validate_schema`] so types can check the schemas
/// nested in their keywords against the same registry.
#[derive(Debug, Clone, Copy)]
pub struct SchemaScope<'a> {
    types: &'a TypeRegistry,
    depth: usize,
    max_depth: usize,
}

impl<'a> SchemaScope<'a> {
    pub(crate) fn new(types: &'a TypeRegistry, max_depth: usize) -> Self {
        Self {
            types,
            depth: 0,
            max_depth,
        }
    }

    /// Registry used to resolve nested types
    pub fn types(&self) -> &'a TypeRegistry {
        self.types
    }

    /// Nesting depth of the schema being checked
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Validate a nested schema; `label` names it in error messages
    pub fn validate_nested(&self, value: &Value, label: &str) -> Result<()> {
        let invalid =
            || SchemaError::invalid_schema(format!("{} must be a valid JSON Schema", label));

        let schema = value.as_object().ok_or_else(invalid)?;
        let type_name = match schema.get("type") {
            Some(Value::String(name)) => name,
            Some(Value::Array(list)) if list.is_empty() => {
                return Err(SchemaError::invalid_schema(format!(
                    "{} must have at least one item",
                    label
                )))
            }
            _ => return Err(invalid()),
        };
        let descriptor = self.types.get(type_name).ok_or_else(invalid)?;

        self.nested()?.check(descriptor, schema)
    }

    fn nested(&self) -> Result<SchemaScope<'a>> {
        if self.depth >= self.max_depth {
            return Err(SchemaError::DepthExceeded(self.max_depth));
        }
        Ok(Self {
            depth: self.depth + 1,
            ..*self
        })
    }

    pub(crate) fn check(&self, descriptor: &TypeDescriptor, schema: &Schema) -> Result<()> {
        // Types without their own `required` keyword accept the boolean form only
        if !descriptor.keywords().contains("required") {
            checks::boolean(schema, "required")?;
        }
        descriptor.kind().validate_schema(schema, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_names() {
        let registry = TypeRegistry::with_builtin_types();
        assert_eq!(
            registry.names(),
            vec!["array", "boolean", "integer", "number", "numeric", "object", "string"]
        );
    }

    #[test]
    fn test_alias_is_a_copy() {
        let mut registry = TypeRegistry::with_builtin_types();
        registry.alias("string", "text").unwrap();

        registry.lookup_mut("string").unwrap().keywords_mut().remove("pattern");

        assert!(!registry.lookup("string").unwrap().keywords().contains("pattern"));
        assert!(registry.lookup("text").unwrap().keywords().contains("pattern"));
        assert_eq!(registry.lookup("text").unwrap().name(), "text");
    }

    #[test]
    fn test_alias_errors() {
        let mut registry = TypeRegistry::with_builtin_types();

        let err = registry.alias("binary", "blob").unwrap_err();
        assert_eq!(err, SchemaError::unknown_type("binary"));

        let err = registry.alias("string", "").unwrap_err();
        assert_eq!(err.to_string(), "alias must be a non-empty string");
    }

    #[test]
    fn test_unregister_unknown_is_noop() {
        let mut registry = TypeRegistry::with_builtin_types();
        assert!(registry.unregister("binary").is_none());
        assert_eq!(registry.len(), 7);
    }

    #[test]
    fn test_root_shape() {
        let registry = TypeRegistry::with_builtin_types();

        let err = registry.validate_schema(&json!([]), 8).unwrap_err();
        assert_eq!(err.to_string(), "schema must be an object");

        let err = registry.validate_schema(&json!({"type": ["string"]}), 8).unwrap_err();
        assert_eq!(err.to_string(), "schema.type must be a string");

        let err = registry.validate_schema(&json!({"type": "xyz"}), 8).unwrap_err();
        assert_eq!(err.to_string(), "Unknown type 'xyz'");
    }

    #[test]
    fn test_required_must_be_boolean() {
        let registry = TypeRegistry::with_builtin_types();
        let err = registry
            .validate_schema(&json!({"type": "numeric", "required": 1}), 8)
            .unwrap_err();
        assert_eq!(err.to_string(), "required must be a boolean");
    }

    #[test]
    fn test_depth_limit() {
        let registry = TypeRegistry::with_builtin_types();
        let schema = json!({
            "type": "array",
            "items": {"type": "array", "items": {"type": "array", "items": {"type": "string"}}}
        });

        assert!(registry.validate_schema(&schema, 3).is_ok());
        assert_eq!(
            registry.validate_schema(&schema, 2).unwrap_err(),
            SchemaError::DepthExceeded(2)
        );
    }
}
