//! Errors - パイプライン各段のエラー型
//!
//! # 分類
//! - `SignatureError`: 検証できないリクエスト（常に 400）
//! - `PayloadError`: 不正な envelope（常に 400）
//! - `TaskError`: 解決失敗 / 送信前のシリアライズ失敗 / 配送失敗
//!
//! タスク本体が返す失敗は `TaskFailure`（outcome.rs）で表し、
//! Executor の外には漏らしません。

use thiserror::Error;

/// Inbound request could not be authenticated.
///
/// Every cryptographic failure collapses into `Invalid`; the cause string is
/// kept for logs only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("missing signature")]
    Missing,

    #[error("invalid signature: {0}")]
    Invalid(String),
}

/// Webhook body is not a well-formed task envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("payload must be a JSON object")]
    NotAnObject,

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid field '{field}': {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },
}

/// Resolution or submission failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("could not import module '{0}'")]
    ModuleNotFound(String),

    #[error("task '{function}' not found in module '{module}'")]
    FunctionNotFound { module: String, function: String },

    #[error("arguments are not JSON serializable: {0}")]
    Serialization(String),

    #[error("failed to submit task: {0}")]
    Delivery(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_error_messages() {
        assert_eq!(SignatureError::Missing.to_string(), "missing signature");
        assert!(
            SignatureError::Invalid("exp".into())
                .to_string()
                .starts_with("invalid signature")
        );
    }

    #[test]
    fn task_error_messages_name_the_failure() {
        let e = TaskError::ModuleNotFound("app.tasks".into());
        assert!(e.to_string().contains("could not import"));

        let e = TaskError::FunctionNotFound {
            module: "app.tasks".into(),
            function: "add".into(),
        };
        assert!(e.to_string().contains("not found"));
    }
}
