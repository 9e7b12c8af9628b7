//! Keyword dispatch
//!
//! Validating data against a compiled node runs in three steps:
//!
//! 1. Absent data takes the schema's `default`. With no default, a node
//!    with `required: true` reports a `required` error and any other node a
//!    `type` error.
//! 2. The type's data check runs. A failure stops here, so keywords only
//!    ever see data of the right shape.
//! 3. Every schema key with a validator in the type's keyword table runs,
//!    in schema order. `type` and `default` are never dispatched.
//!
//! Validators that panic are reported as a failure of their keyword.

use regex::Regex;
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{trace, warn};

use crate::compiler::SchemaNode;
use crate::config::Mode;
use crate::error::ValidationError;
use crate::outcome::{
    self, KeywordOutcome, Report, INVALID_DATA, INVALID_TYPE, SYNCHRONOUS_VIOLATION,
};
use crate::registry::{Schema, TypeRegistry};

/// Keys never dispatched as keywords
const RESERVED: &[&str] = &["type", "default"];

/// What a keyword validator can see besides its value and the data
pub struct KeywordContext<'a> {
    node: &'a Arc<SchemaNode>,
    path: &'a str,
}

impl<'a> KeywordContext<'a> {
    pub(crate) fn new(node: &'a Arc<SchemaNode>, path: &'a str) -> Self {
        Self { node, path }
    }

    /// The normalized schema being applied
    pub fn schema(&self) -> &'a Schema {
        self.node.schema()
    }

    /// The compiled node being applied
    pub fn node(&self) -> &'a Arc<SchemaNode> {
        self.node
    }

    /// Type registry captured at compile time
    pub fn types(&self) -> &'a TypeRegistry {
        self.node.types()
    }

    /// JSON pointer of the data being validated
    pub fn path(&self) -> &'a str {
        self.path
    }

    pub fn mode(&self) -> Mode {
        self.node.mode()
    }

    /// A pattern compiled for this node
    pub fn regex(&self, pattern: &str) -> Option<&'a Regex> {
        self.node.regex(pattern)
    }

    /// Validate `data` against a nested schema
    ///
    /// `location` names the nested schema (`properties/name`, `items/0`,
    /// ...) and `segment` is appended to the data path.
    pub fn validate_child(&self, location: &str, segment: &str, data: Option<&Value>) -> Report {
        match self.node.child(location) {
            Some(child) => run(child, data, join_path(self.path, segment)),
            None => Report::Ready(vec![ValidationError::new(
                "schema",
                format!("no compiled schema at '{}'", location),
            )]),
        }
    }
}

fn join_path(base: &str, segment: &str) -> String {
    if segment.is_empty() {
        return base.to_string();
    }
    format!("{}/{}", base, segment.replace('~', "~0").replace('/', "~1"))
}

/// Validate data, or its absence, against a compiled node
pub(crate) fn run(node: &Arc<SchemaNode>, data: Option<&Value>, path: String) -> Report {
    let data = match data.or_else(|| node.schema().get("default")) {
        Some(data) => data,
        None => return Report::Ready(vec![missing(node)]),
    };

    let ctx = KeywordContext::new(node, &path);
    let shape = guard("type", || node.descriptor().kind().check_data(data, &ctx));

    match shape {
        KeywordOutcome::Valid => run_keywords(node, data, &ctx),
        KeywordOutcome::Pending(_) if node.mode() == Mode::Synchronous => {
            warn!(
                path = %path,
                type_name = node.type_name(),
                "Type check deferred in synchronous mode"
            );
            Report::Ready(vec![ValidationError::new("type", SYNCHRONOUS_VIOLATION)])
        }
        KeywordOutcome::Pending(check) => {
            let node = Arc::clone(node);
            let data = data.clone();
            Report::Pending(Box::pin(async move {
                let check = KeywordOutcome::Pending(check);
                let errors = outcome::settle(check, "type".to_string(), INVALID_TYPE).await;
                if !errors.is_empty() {
                    return errors;
                }
                let report = {
                    let ctx = KeywordContext::new(&node, &path);
                    run_keywords(&node, &data, &ctx)
                };
                report.settle().await
            }))
        }
        failed => Report::Ready(failed.into_errors_with("type", INVALID_TYPE)),
    }
}

fn missing(node: &SchemaNode) -> ValidationError {
    if node.schema().get("required").and_then(Value::as_bool) == Some(true) {
        ValidationError::new("required", "a value is required")
    } else {
        ValidationError::new("type", "data is missing")
    }
}

fn run_keywords(node: &Arc<SchemaNode>, data: &Value, ctx: &KeywordContext<'_>) -> Report {
    let mut reports = Vec::new();

    for (keyword, value) in node.schema() {
        if RESERVED.contains(&keyword.as_str()) {
            continue;
        }
        let Some(validate) = node.descriptor().keyword(keyword) else {
            continue;
        };

        trace!(keyword = %keyword, path = ctx.path(), "Applying keyword");

        let outcome = guard(keyword, || validate(value, data, ctx));
        reports.push(resolve(outcome, keyword, node.mode(), ctx.path()));
    }

    Report::merge(reports)
}

fn resolve(outcome: KeywordOutcome, keyword: &str, mode: Mode, path: &str) -> Report {
    match outcome {
        KeywordOutcome::Pending(_) if mode == Mode::Synchronous => {
            warn!(keyword = %keyword, path = %path, "Keyword deferred in synchronous mode");
            Report::Ready(vec![ValidationError::new(keyword, SYNCHRONOUS_VIOLATION)])
        }
        pending @ KeywordOutcome::Pending(_) => {
            Report::Pending(outcome::settle(pending, keyword.to_string(), INVALID_DATA))
        }
        settled => Report::Ready(settled.into_errors(keyword)),
    }
}

/// Call a validator, turning a panic into a failure record
fn guard(keyword: &str, call: impl FnOnce() -> KeywordOutcome) -> KeywordOutcome {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(outcome) => outcome,
        Err(payload) => KeywordOutcome::Error(outcome::panicked(keyword, payload.as_ref())),
    }
}
