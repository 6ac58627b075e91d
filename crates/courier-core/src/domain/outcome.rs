//! ExecutionOutcome - 1 回のタスク実行の結果
//!
//! # 設計原則
//! - executor は失敗を外に漏らさない。すべて `ExecutionOutcome` になる
//! - recorder がそれを `TaskStatus` に分類する

use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a failure came from. Drives status classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureOrigin {
    /// Raised by task code or while binding its arguments.
    Application,
    /// Raised by the dispatch pipeline itself (resolution etc).
    Internal,
    /// Anything else, e.g. a panic inside the task.
    Unrecognized,
}

/// A failure reported by (or on behalf of) a task.
///
/// Task code returns `Result<_, TaskFailure>`. Any `std::error::Error` converts
/// via `?`; the error's type name becomes `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub kind: String,
    pub message: String,
    pub trace: String,
    pub origin: FailureOrigin,
}

impl TaskFailure {
    /// Application failure, e.g. `TaskFailure::new("ValueError", "bad")`.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_origin(FailureOrigin::Application, kind, message)
    }

    pub fn internal(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_origin(FailureOrigin::Internal, kind, message)
    }

    pub fn unrecognized(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_origin(FailureOrigin::Unrecognized, kind, message)
    }

    fn with_origin(
        origin: FailureOrigin,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let kind = kind.into();
        let message = message.into();
        let trace = format!("{kind}: {message}");
        Self {
            kind,
            message,
            trace,
            origin,
        }
    }

    /// Prepends a frame (e.g. the task path) to the trace.
    pub fn in_frame(mut self, frame: &str) -> Self {
        self.trace = format!("in {frame}\n{}", self.trace);
        self
    }

    fn push_cause(&mut self, cause: &dyn StdError) {
        self.trace.push_str("\nCaused by: ");
        self.trace.push_str(&cause.to_string());
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl<E: StdError + 'static> From<E> for TaskFailure {
    fn from(err: E) -> Self {
        let type_name = std::any::type_name::<E>();
        let kind = type_name.rsplit("::").next().unwrap_or(type_name);
        let mut failure = TaskFailure::new(kind, err.to_string());
        let mut source = err.source();
        while let Some(cause) = source {
            failure.push_cause(cause);
            source = cause.source();
        }
        failure
    }
}

/// Result of invoking a resolved task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Success(serde_json::Value),
    Failure(TaskFailure),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success(_))
    }

    pub fn value(&self) -> Option<&serde_json::Value> {
        match self {
            ExecutionOutcome::Success(v) => Some(v),
            ExecutionOutcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&TaskFailure> {
        match self {
            ExecutionOutcome::Success(_) => None,
            ExecutionOutcome::Failure(f) => Some(f),
        }
    }
}
