//! TaskStatus - 実行結果の分類（閉じた列挙）

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Status taxonomy stored with every `TaskResult`.
///
/// Serialized as SCREAMING_SNAKE_CASE (`"EXECUTION_ERROR"`).
///
/// - `Pending`: record created, execution not finished
/// - `Success` / `ExecutionError` / `InternalError` / `OtherError`: terminal
/// - `Unknown`: returned by queries when no record exists; never written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Success,
    ExecutionError,
    InternalError,
    OtherError,
    Unknown,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 6] = [
        TaskStatus::Pending,
        TaskStatus::Success,
        TaskStatus::ExecutionError,
        TaskStatus::InternalError,
        TaskStatus::OtherError,
        TaskStatus::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Success => "SUCCESS",
            TaskStatus::ExecutionError => "EXECUTION_ERROR",
            TaskStatus::InternalError => "INTERNAL_ERROR",
            TaskStatus::OtherError => "OTHER_ERROR",
            TaskStatus::Unknown => "UNKNOWN",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Success
                | TaskStatus::ExecutionError
                | TaskStatus::InternalError
                | TaskStatus::OtherError
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task status '{0}'")]
pub struct ParseStatusError(String);

impl FromStr for TaskStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}
