//! Engine facade
//!
//! An [`Engine`] owns a private type registry, seeded with the generic
//! types, and compiles schemas against a snapshot of it. Registry edits made
//! after a compile never affect validators already built.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::compiler::{self, Validator};
use crate::config::{EngineConfig, Mode};
use crate::dispatch::KeywordContext;
use crate::error::{Result, SchemaError};
use crate::outcome::KeywordOutcome;
use crate::registry::{Schema, TypeDescriptor, TypeRegistry};
use crate::types::custom::CustomType;

/// Schema engine: a type registry plus compile entry points
#[derive(Clone, Debug)]
pub struct Engine {
    config: EngineConfig,
    types: TypeRegistry,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create a synchronous engine with the generic types
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine that awaits deferred results
    pub fn asynchronous() -> Self {
        Self::with_config(EngineConfig::asynchronous())
    }

    /// Create an engine from a configuration
    pub fn with_config(config: EngineConfig) -> Self {
        debug!(mode = %config.mode(), max_depth = config.max_depth, "Creating schema engine");
        Self {
            config,
            types: TypeRegistry::with_builtin_types(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.config.mode()
    }

    /// Registered types
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Register a type defined by a data check
    ///
    /// The type understands `enum` and the boolean `required`; more keywords
    /// can be attached with [`Engine::add_keyword`]. An existing type of the
    /// same name is replaced.
    pub fn add_type<F>(&mut self, name: &str, check: F) -> Result<()>
    where
        F: Fn(&Value, &KeywordContext<'_>) -> KeywordOutcome + Send + Sync + 'static,
    {
        non_empty(name, "type name")?;
        self.types
            .register(TypeDescriptor::new(name, Arc::new(CustomType::new(Arc::new(check)))));
        info!(type_name = %name, "Type registered");
        Ok(())
    }

    /// Register a type that adds a data check to an existing one
    ///
    /// The new type starts with a copy of the base type's keywords and
    /// compile steps.
    pub fn derive_type<F>(&mut self, base: &str, name: &str, check: F) -> Result<()>
    where
        F: Fn(&Value, &KeywordContext<'_>) -> KeywordOutcome + Send + Sync + 'static,
    {
        non_empty(name, "type name")?;
        let derived = self.types.lookup(base)?.refined(name, Arc::new(check));
        self.types.register(derived);
        info!(type_name = %name, base = %base, "Type derived");
        Ok(())
    }

    /// Remove a type; unknown names are ignored
    pub fn remove_type(&mut self, name: &str) {
        if self.types.unregister(name).is_some() {
            info!(type_name = %name, "Type removed");
        }
    }

    /// Register `alias` as a copy of the type `existing`
    pub fn add_alias(&mut self, existing: &str, alias: &str) -> Result<()> {
        self.types.alias(existing, alias)?;
        info!(type_name = %existing, alias = %alias, "Type alias registered");
        Ok(())
    }

    /// Add or replace a keyword validator on a type
    pub fn add_keyword<F>(&mut self, type_name: &str, keyword: &str, validate: F) -> Result<()>
    where
        F: Fn(&Value, &Value, &KeywordContext<'_>) -> KeywordOutcome + Send + Sync + 'static,
    {
        non_empty(keyword, "keyword")?;
        self.types
            .lookup_mut(type_name)?
            .keywords_mut()
            .insert(keyword, Arc::new(validate));
        debug!(type_name = %type_name, keyword = %keyword, "Keyword registered");
        Ok(())
    }

    /// Remove a keyword validator from a type
    pub fn remove_keyword(&mut self, type_name: &str, keyword: &str) -> Result<()> {
        self.types.lookup_mut(type_name)?.keywords_mut().remove(keyword);
        debug!(type_name = %type_name, keyword = %keyword, "Keyword removed");
        Ok(())
    }

    /// Append a schema transformation run when compiling nodes of a type
    pub fn add_compile_step<F>(&mut self, type_name: &str, step: F) -> Result<()>
    where
        F: Fn(&mut Schema) -> Result<()> + Send + Sync + 'static,
    {
        self.types.lookup_mut(type_name)?.add_compile_step(Arc::new(step));
        Ok(())
    }

    /// Meta-validate a schema and return a normalized copy of it
    ///
    /// Nested schemas are normalized by their own types, as they are when
    /// compiling.
    pub fn validate_schema(&self, schema: &Value) -> Result<Schema> {
        let mut root = self.types.validate_schema(schema, self.config.max_depth)?;
        compiler::normalize_tree(&self.types, &mut root, 0, self.config.max_depth)?;
        Ok(root)
    }

    /// Compile a schema, blocking on deferred default checks
    pub fn compile(&self, schema: &Value) -> Result<Validator> {
        compiler::compile(self.snapshot(), schema, &self.config)?.finish_blocking()
    }

    /// Compile a schema, awaiting deferred default checks
    pub async fn compile_async(&self, schema: &Value) -> Result<Validator> {
        let compilation = compiler::compile(self.snapshot(), schema, &self.config)?;
        compilation.finish().await
    }

    fn snapshot(&self) -> Arc<TypeRegistry> {
        Arc::new(self.types.clone())
    }
}

fn non_empty(value: &str, what: &str) -> Result<()> {
    if value.is_empty() {
        return Err(SchemaError::invalid_argument(format!(
            "{} must be a non-empty string",
            what
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_type_errors() {
        let mut engine = Engine::new();

        let err = engine.add_keyword("xyz", "k", |_, _, _| KeywordOutcome::Valid).unwrap_err();
        assert_eq!(err.to_string(), "Unknown type 'xyz'");

        let err = engine.remove_keyword("xyz", "k").unwrap_err();
        assert_eq!(err.to_string(), "Unknown type 'xyz'");

        let err = engine.add_compile_step("xyz", |_| Ok(())).unwrap_err();
        assert_eq!(err.to_string(), "Unknown type 'xyz'");

        let err = engine.derive_type("xyz", "abc", |_, _| KeywordOutcome::Valid).unwrap_err();
        assert_eq!(err.to_string(), "Unknown type 'xyz'");
    }

    #[test]
    fn test_empty_names_rejected() {
        let mut engine = Engine::new();
        assert!(matches!(
            engine.add_type("", |_, _| KeywordOutcome::Valid),
            Err(SchemaError::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.add_keyword("string", "", |_, _, _| KeywordOutcome::Valid),
            Err(SchemaError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_remove_type() {
        let mut engine = Engine::new();
        engine.remove_type("string");
        engine.remove_type("not-registered");

        let err = engine.compile(&json!({"type": "string"})).unwrap_err();
        assert_eq!(err.to_string(), "Unknown type 'string'");
        assert!(engine.compile(&json!({"type": "numeric"})).is_ok());
    }

    #[test]
    fn test_remove_keyword_disables_it() {
        let mut engine = Engine::new();
        engine.remove_keyword("string", "maxLength").unwrap();

        let validator = engine.compile(&json!({"type": "string", "maxLength": 1})).unwrap();
        assert!(validator.validate(&json!("long")).is_ok());
    }

    #[test]
    fn test_compile_step() {
        let mut engine = Engine::new();
        engine
            .add_compile_step("string", |schema| {
                schema.entry("maxLength").or_insert(json!(3));
                Ok(())
            })
            .unwrap();

        let validator = engine.compile(&json!({"type": "string"})).unwrap();
        assert_eq!(validator.schema()["maxLength"], json!(3));
        assert!(validator.validate(&json!("abcd")).is_err());
    }

    #[test]
    fn test_failing_compile_step() {
        let mut engine = Engine::new();
        engine
            .add_compile_step("string", |_| {
                Err(SchemaError::invalid_schema("strings are disabled"))
            })
            .unwrap();

        let err = engine.compile(&json!({"type": "string"})).unwrap_err();
        assert_eq!(err.to_string(), "strings are disabled");
    }

    #[test]
    fn test_snapshot_isolation() {
        let mut engine = Engine::new();
        let validator = engine.compile(&json!({"type": "string", "maxLength": 1})).unwrap();

        engine.remove_keyword("string", "maxLength").unwrap();
        engine.remove_type("string");

        assert!(validator.validate(&json!("long")).is_err());
    }

    #[test]
    fn test_validate_schema_returns_normalized_copy() {
        let engine = Engine::new();
        let schema = json!({"type": "array"});
        let normalized = engine.validate_schema(&schema).unwrap();

        assert_eq!(normalized["uniqueItems"], json!(false));
        assert!(schema.get("uniqueItems").is_none());
    }

    #[test]
    fn test_validate_schema_normalizes_nested_schemas() {
        let engine = Engine::new();
        let normalized = engine
            .validate_schema(&json!({
                "type": "object",
                "properties": {
                    "limits": {"type": "array", "items": [{"type": "numeric"}]},
                    "a/b": {"type": "integer"}
                },
                "patternProperties": {"^x/": {"type": "array"}},
                "dependencies": {"limits": {"properties": {"n": {"type": "numeric"}}}}
            }))
            .unwrap();

        let limits = &normalized["properties"]["limits"];
        assert_eq!(limits["uniqueItems"], json!(false));
        assert_eq!(limits["items"][0]["exclusiveMaximum"], json!(false));
        assert_eq!(normalized["properties"]["a/b"]["exclusiveMinimum"], json!(false));
        assert_eq!(normalized["patternProperties"]["^x/"]["uniqueItems"], json!(false));

        let dependency = &normalized["dependencies"]["limits"];
        assert_eq!(dependency["type"], json!("object"));
        assert_eq!(dependency["properties"]["n"]["exclusiveMaximum"], json!(false));
    }
}
