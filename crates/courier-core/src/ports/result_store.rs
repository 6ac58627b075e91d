//! ResultStore port - TaskResult の永続化（任意サブシステム）
//!
//! # 設計原則
//! - `task_id` で upsert（再配送は上書き、行は増えない）
//! - 1 行単位で原子的に書き込む
//! - 保持期間の掃除は `date_created` 基準

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{TaskId, TaskResult};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store operation failed: {0}")]
    OperationFailed(String),
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Insert, or overwrite the row holding the same `task_id`.
    ///
    /// An overwrite keeps the existing row's `id` and `date_created`.
    /// Returns the row as stored.
    async fn upsert(&self, result: TaskResult) -> Result<TaskResult, StoreError>;

    async fn get(&self, task_id: &TaskId) -> Result<Option<TaskResult>, StoreError>;

    /// Deletes rows created strictly before `cutoff`; returns how many.
    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;
}
