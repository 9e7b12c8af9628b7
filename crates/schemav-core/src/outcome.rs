//! Keyword results and deferred reports
//!
//! Every keyword and type check returns a [`KeywordOutcome`]. A boolean, a
//! single record, a list of nested records and a deferred computation are
//! all accepted; the dispatcher turns them into a flat list of
//! [`ValidationError`] records.
//!
//! Evaluating a schema node yields a [`Report`], which is either ready or
//! pending. Pending reports are joined with `join_all`, so results are
//! always buffered by their original position and never by completion
//! order.

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use crate::error::ValidationError;

/// Message used when a keyword answers `false`
pub const INVALID_DATA: &str = "invalid input data";

/// Message used when a type check answers `false`
pub const INVALID_TYPE: &str = "invalid type input";

/// Message used when a deferred result shows up in synchronous mode
pub const SYNCHRONOUS_VIOLATION: &str = "asynchronous result in synchronous mode";

/// Result of a keyword or type check
pub enum KeywordOutcome {
    /// The data satisfies the keyword
    Valid,
    /// The data violates the keyword; a generic record is synthesized
    Invalid,
    /// One failure record; an empty `keyword` is filled in by the dispatcher
    Error(ValidationError),
    /// Nested failures, wrapped into one record for the keyword
    Errors(Vec<ValidationError>),
    /// A result that is only available later
    Pending(BoxFuture<'static, KeywordOutcome>),
}

impl KeywordOutcome {
    /// Fail with a message; the keyword is filled in by the dispatcher
    pub fn reject(message: impl Into<String>) -> Self {
        KeywordOutcome::Error(ValidationError::message(message))
    }

    /// Wrap a future producing the outcome
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = KeywordOutcome> + Send + 'static,
    {
        KeywordOutcome::Pending(future.boxed())
    }

    /// Whether the outcome still has to be awaited
    pub fn is_pending(&self) -> bool {
        matches!(self, KeywordOutcome::Pending(_))
    }

    /// Whether the outcome is an immediate success
    pub fn is_valid(&self) -> bool {
        matches!(self, KeywordOutcome::Valid)
    }

    /// Convert a settled outcome into records attributed to `keyword`
    pub fn into_errors(self, keyword: &str) -> Vec<ValidationError> {
        self.into_errors_with(keyword, INVALID_DATA)
    }

    pub(crate) fn into_errors_with(self, keyword: &str, invalid: &str) -> Vec<ValidationError> {
        match self {
            KeywordOutcome::Valid => Vec::new(),
            KeywordOutcome::Invalid => vec![ValidationError::new(keyword, invalid)],
            KeywordOutcome::Error(error) => vec![attribute(error, keyword)],
            KeywordOutcome::Errors(errors) if errors.is_empty() => Vec::new(),
            KeywordOutcome::Errors(errors) => {
                let nested = errors.into_iter().map(|e| attribute(e, keyword)).collect();
                let message = format!("invalid {}", keyword);
                vec![ValidationError::new(keyword, message).with_errors(nested)]
            }
            KeywordOutcome::Pending(_) => {
                vec![ValidationError::new(keyword, SYNCHRONOUS_VIOLATION)]
            }
        }
    }

    /// Run `next` only once `self` has succeeded
    ///
    /// When `self` is deferred, `next` is evaluated up front and only
    /// consulted after `self` settles as valid.
    pub fn and_then(self, next: impl FnOnce() -> KeywordOutcome) -> KeywordOutcome {
        match self {
            KeywordOutcome::Valid => next(),
            KeywordOutcome::Pending(first) => {
                let second = next();
                KeywordOutcome::deferred(async move {
                    match resolve(KeywordOutcome::Pending(first)).await {
                        KeywordOutcome::Valid => second,
                        failed => failed,
                    }
                })
            }
            failed => failed,
        }
    }
}

impl From<bool> for KeywordOutcome {
    fn from(valid: bool) -> Self {
        if valid {
            KeywordOutcome::Valid
        } else {
            KeywordOutcome::Invalid
        }
    }
}

impl From<ValidationError> for KeywordOutcome {
    fn from(error: ValidationError) -> Self {
        KeywordOutcome::Error(error)
    }
}

impl From<Vec<ValidationError>> for KeywordOutcome {
    fn from(errors: Vec<ValidationError>) -> Self {
        if errors.is_empty() {
            KeywordOutcome::Valid
        } else {
            KeywordOutcome::Errors(errors)
        }
    }
}

impl<E: fmt::Display> From<std::result::Result<(), E>> for KeywordOutcome {
    fn from(result: std::result::Result<(), E>) -> Self {
        match result {
            Ok(()) => KeywordOutcome::Valid,
            Err(e) => KeywordOutcome::reject(e.to_string()),
        }
    }
}

impl fmt::Debug for KeywordOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeywordOutcome::Valid => write!(f, "Valid"),
            KeywordOutcome::Invalid => write!(f, "Invalid"),
            KeywordOutcome::Error(e) => f.debug_tuple("Error").field(e).finish(),
            KeywordOutcome::Errors(e) => f.debug_tuple("Errors").field(e).finish(),
            KeywordOutcome::Pending(_) => write!(f, "Pending(..)"),
        }
    }
}

fn attribute(mut error: ValidationError, keyword: &str) -> ValidationError {
    if error.keyword.is_empty() {
        error.keyword = keyword.to_string();
    }
    error
}

/// Await an outcome until it is no longer pending
pub async fn resolve(mut outcome: KeywordOutcome) -> KeywordOutcome {
    while let KeywordOutcome::Pending(future) = outcome {
        outcome = future.await;
    }
    outcome
}

/// Settle a possibly deferred outcome into records for `keyword`
///
/// Panics raised while polling are reported as a failure of the keyword.
pub(crate) fn settle(
    outcome: KeywordOutcome,
    keyword: String,
    invalid: &'static str,
) -> BoxFuture<'static, Vec<ValidationError>> {
    async move {
        let mut outcome = outcome;
        loop {
            match outcome {
                KeywordOutcome::Pending(future) => {
                    match AssertUnwindSafe(future).catch_unwind().await {
                        Ok(next) => outcome = next,
                        Err(payload) => return vec![panicked(&keyword, payload.as_ref())],
                    }
                }
                settled => return settled.into_errors_with(&keyword, invalid),
            }
        }
    }
    .boxed()
}

/// Build the record for a validator that panicked
pub(crate) fn panicked(keyword: &str, payload: &(dyn Any + Send)) -> ValidationError {
    let detail = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };

    tracing::warn!(keyword = %keyword, panic = %detail, "Validator panicked");

    ValidationError::new(keyword, format!("validator panicked: {}", detail))
}

/// Errors found for one schema node, possibly still being computed
pub enum Report {
    /// All checks have answered
    Ready(Vec<ValidationError>),
    /// Some checks are still running
    Pending(BoxFuture<'static, Vec<ValidationError>>),
}

impl Report {
    /// A report without errors
    pub fn valid() -> Self {
        Report::Ready(Vec::new())
    }

    /// Whether the report still has to be awaited
    pub fn is_pending(&self) -> bool {
        matches!(self, Report::Pending(_))
    }

    /// Await the final error list
    pub async fn settle(self) -> Vec<ValidationError> {
        match self {
            Report::Ready(errors) => errors,
            Report::Pending(future) => future.await,
        }
    }

    /// Block the current thread until the error list is known
    pub fn wait(self) -> Vec<ValidationError> {
        match self {
            Report::Ready(errors) => errors,
            Report::Pending(future) => futures::executor::block_on(future),
        }
    }

    /// Concatenate reports in order
    pub fn merge(reports: Vec<Report>) -> Report {
        match ready_all(reports) {
            Ok(lists) => Report::Ready(lists.into_iter().flatten().collect()),
            Err(reports) => Report::Pending(
                async move {
                    join_all(reports.into_iter().map(Report::settle))
                        .await
                        .into_iter()
                        .flatten()
                        .collect()
                }
                .boxed(),
            ),
        }
    }

    /// View the report as a keyword outcome
    pub fn into_outcome(self) -> KeywordOutcome {
        match self {
            Report::Ready(errors) => errors.into(),
            Report::Pending(future) => {
                KeywordOutcome::deferred(async move { KeywordOutcome::from(future.await) })
            }
        }
    }
}

impl fmt::Debug for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Ready(errors) => f.debug_tuple("Ready").field(errors).finish(),
            Report::Pending(_) => write!(f, "Pending(..)"),
        }
    }
}

/// Join child reports and build one outcome from their error lists
///
/// `finish` receives one list per report, in the order given. It runs
/// immediately when every report is ready, otherwise once all of them have
/// settled.
pub fn gather<F>(reports: Vec<Report>, finish: F) -> KeywordOutcome
where
    F: FnOnce(Vec<Vec<ValidationError>>) -> KeywordOutcome + Send + 'static,
{
    match ready_all(reports) {
        Ok(lists) => finish(lists),
        Err(reports) => KeywordOutcome::deferred(async move {
            finish(join_all(reports.into_iter().map(Report::settle)).await)
        }),
    }
}

fn ready_all(reports: Vec<Report>) -> std::result::Result<Vec<Vec<ValidationError>>, Vec<Report>> {
    if reports.iter().any(Report::is_pending) {
        return Err(reports);
    }

    Ok(reports
        .into_iter()
        .map(|report| match report {
            Report::Ready(errors) => errors,
            Report::Pending(_) => Vec::new(),
        })
        .collect())
}
