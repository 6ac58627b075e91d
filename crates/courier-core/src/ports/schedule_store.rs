//! ScheduleStore port - 外部スケジュールのローカルミラー

use async_trait::async_trait;

use super::result_store::StoreError;
use crate::domain::{ScheduleId, TaskSchedule};

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Insert or replace by `schedule_id`.
    async fn save(&self, schedule: TaskSchedule) -> Result<(), StoreError>;

    async fn get(&self, schedule_id: &ScheduleId) -> Result<Option<TaskSchedule>, StoreError>;

    /// All schedules ordered by name.
    async fn list(&self) -> Result<Vec<TaskSchedule>, StoreError>;

    /// Returns whether a row was removed.
    async fn delete(&self, schedule_id: &ScheduleId) -> Result<bool, StoreError>;
}
