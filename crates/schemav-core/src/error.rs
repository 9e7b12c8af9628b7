//! Error types for the schema engine
//!
//! Two families of errors exist:
//!
//! - [`SchemaError`]: configuration and usage mistakes (malformed schema,
//!   unknown type, bad registry arguments). Raised by the registry facade and
//!   by meta-validation; compilation never yields a partial validator.
//! - [`ValidationErrors`]: the expected outcome of checking untrusted data,
//!   carrying the full list of structured [`ValidationError`] records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Configuration and schema errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// A schema or registry call named a type that is not registered
    #[error("Unknown type '{0}'")]
    UnknownType(String),

    /// A registry call received an unusable argument
    #[error("{0}")]
    InvalidArgument(String),

    /// The schema document is malformed
    #[error("{0}")]
    InvalidSchema(String),

    /// The declared `default` does not satisfy its own schema
    #[error("Invalid default value {value}")]
    InvalidDefault {
        /// JSON rendering of the rejected default
        value: String,
        /// Errors reported while validating the default
        errors: Vec<ValidationError>,
    },

    /// Nested schemas go deeper than the configured limit
    #[error("schema nesting exceeds the maximum depth of {0}")]
    DepthExceeded(usize),
}

impl SchemaError {
    /// Create an invalid schema error
    pub fn invalid_schema(msg: impl Into<String>) -> Self {
        SchemaError::InvalidSchema(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        SchemaError::InvalidArgument(msg.into())
    }

    /// Create an unknown type error
    pub fn unknown_type(name: impl Into<String>) -> Self {
        SchemaError::UnknownType(name.into())
    }

    /// Create an invalid default error for `value`
    pub fn invalid_default(value: &Value, errors: Vec<ValidationError>) -> Self {
        SchemaError::InvalidDefault {
            value: value.to_string(),
            errors,
        }
    }

    /// Check if this error was caused by the caller's schema or arguments
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            SchemaError::UnknownType(_)
                | SchemaError::InvalidArgument(_)
                | SchemaError::InvalidSchema(_)
                | SchemaError::InvalidDefault { .. }
        )
    }
}

/// Result type alias for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// A single structured validation failure
///
/// Records nest to mirror the data: a failing property or array item is
/// reported as a record carrying `prop`/`index` and the nested `errors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Keyword that produced the failure (`type`, `minLength`, ...)
    pub keyword: String,
    /// Human-readable message
    pub message: String,
    /// Property name, for records describing an object member
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prop: Option<String>,
    /// Item position, for records describing an array element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Keyword-specific fields (`size`, `maxLength`, `missing`, ...)
    #[serde(flatten)]
    pub details: Map<String, Value>,
    /// Nested failures
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationError>,
}

impl ValidationError {
    /// Create a new error record
    pub fn new(keyword: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            message: message.into(),
            prop: None,
            index: None,
            details: Map::new(),
            errors: Vec::new(),
        }
    }

    /// Create a record without a keyword; the dispatcher fills it in
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(String::new(), message)
    }

    /// Attach a keyword-specific field
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Attach the property name
    pub fn with_prop(mut self, prop: impl Into<String>) -> Self {
        self.prop = Some(prop.into());
        self
    }

    /// Attach the item index
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Attach nested errors
    pub fn with_errors(mut self, errors: Vec<ValidationError>) -> Self {
        self.errors = errors;
        self
    }

    /// Look up a keyword-specific field
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }

    /// Serialize the record into a JSON value
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.prop, self.index) {
            (Some(prop), _) => write!(f, "[{}] '{}': {}", self.keyword, prop, self.message),
            (None, Some(index)) => write!(f, "[{}] #{}: {}", self.keyword, index, self.message),
            (None, None) => write!(f, "[{}] {}", self.keyword, self.message),
        }
    }
}

/// Failure returned by `validate`, carrying every error found
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{message}")]
pub struct ValidationErrors {
    /// Summary message
    pub message: String,
    /// Top-level error records
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Wrap a list of records
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self {
            message: "invalid data".to_string(),
            errors,
        }
    }

    /// Number of top-level records
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Find the first top-level record for `keyword`
    pub fn find(&self, keyword: &str) -> Option<&ValidationError> {
        self.errors.iter().find(|e| e.keyword == keyword)
    }

    /// Top-level keywords in report order
    pub fn keywords(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.keyword.as_str()).collect()
    }
}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self::new(errors)
    }
}
