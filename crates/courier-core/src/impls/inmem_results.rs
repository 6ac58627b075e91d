//! InMemoryResultStore - 開発用の結果ストア
//!
//! # 実装詳細
//! - `HashMap<TaskId, TaskResult>` を tokio の `RwLock` で保護
//! - 上書き時は既存行の `id` と `date_created` を引き継ぐ
//! - プロセスが落ちれば消える（永続化はしない）

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::{TaskId, TaskResult};
use crate::ports::{ResultStore, StoreError};

#[derive(Default)]
pub struct InMemoryResultStore {
    rows: RwLock<HashMap<TaskId, TaskResult>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn upsert(&self, mut result: TaskResult) -> Result<TaskResult, StoreError> {
        let mut rows = self.rows.write().await;
        if let Some(existing) = rows.get(&result.task_id) {
            result.id = existing.id;
            result.date_created = existing.date_created;
        }
        rows.insert(result.task_id.clone(), result.clone());
        Ok(result)
    }

    async fn get(&self, task_id: &TaskId) -> Result<Option<TaskResult>, StoreError> {
        Ok(self.rows.read().await.get(task_id).cloned())
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, row| row.date_created >= cutoff);
        Ok(before - rows.len())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.rows.read().await.len())
    }
}
