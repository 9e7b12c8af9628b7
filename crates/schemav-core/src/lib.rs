//! Schemav Core
//!
//! An extensible JSON Schema validation engine. Schemas are compiled once
//! into immutable validators; types and keywords are pluggable at runtime.
//!
//! ## Features
//!
//! - **Type Registry**: Generic `string`, `numeric`/`number`, `integer`,
//!   `boolean`, `array` and `object` types, plus user types, aliases and
//!   derived types
//! - **Pluggable Keywords**: Add or remove keyword validators per type
//! - **Compile Steps**: Transform schemas of a type before they are compiled
//! - **Meta-Validation**: Malformed schemas are rejected with precise messages
//! - **Default Values**: Checked at compile time and substituted for absent data
//! - **Structured Errors**: Nested records mirroring the shape of the data
//! - **Async Validation**: Keywords may defer their answer; nested results
//!   are joined concurrently and kept in positional order
//!
//! ## Architecture
//!
//! 1. **Registry** (`registry`): Type descriptors and keyword tables.
//!
//! 2. **Types** (`types/`): Schema shape rules, data gates and keywords of
//!    the generic types.
//!
//! 3. **Compiler** (`compiler`): Meta-validation, normalization and the
//!    immutable node tree behind a [`Validator`].
//!
//! 4. **Dispatch** (`dispatch`): Default substitution, the data-shape gate
//!    and keyword fan-out.
//!
//! 5. **Outcome** (`outcome`): Keyword results and deferred reports.
//!
//! ## Example
//!
//! ```rust
//! use schemav_core::{Engine, KeywordOutcome};
//! use serde_json::json;
//!
//! let mut engine = Engine::new();
//! engine
//!     .add_keyword("string", "lowercase", |enabled, data, _ctx| {
//!         let lower = data.as_str().map_or(true, |s| s == s.to_lowercase());
//!         (enabled != &json!(true) || lower).into()
//!     })
//!     .unwrap();
//!
//! let validator = engine
//!     .compile(&json!({
//!         "type": "object",
//!         "properties": {
//!             "user": {"type": "string", "lowercase": true, "maxLength": 16},
//!             "age": {"type": "integer", "minimum": 0}
//!         },
//!         "required": ["user"]
//!     }))
//!     .unwrap();
//!
//! assert!(validator.validate(&json!({"user": "ada", "age": 36})).is_ok());
//!
//! let errors = validator.validate(&json!({"user": "Ada"})).unwrap_err();
//! assert_eq!(errors.errors[0].keyword, "properties");
//! ```

pub mod compiler;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod formats;
pub mod outcome;
pub mod registry;
pub mod types;

pub use compiler::{SchemaNode, Validator};
pub use config::{EngineConfig, EngineConfigBuilder, Mode};
pub use dispatch::KeywordContext;
pub use engine::Engine;
pub use error::{Result, SchemaError, ValidationError, ValidationErrors};
pub use outcome::{gather, KeywordOutcome, Report};
pub use registry::{
    CompileStepFn, KeywordFn, KeywordTable, Schema, SchemaScope, TypeCheckFn, TypeDescriptor,
    TypeRegistry,
};
pub use types::SchemaType;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
