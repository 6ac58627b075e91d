//! InMemoryScheduleStore - 開発用のスケジュールミラー

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{ScheduleId, TaskSchedule};
use crate::ports::{ScheduleStore, StoreError};

#[derive(Default)]
pub struct InMemoryScheduleStore {
    rows: RwLock<HashMap<ScheduleId, TaskSchedule>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn save(&self, schedule: TaskSchedule) -> Result<(), StoreError> {
        self.rows
            .write()
            .await
            .insert(schedule.schedule_id.clone(), schedule);
        Ok(())
    }

    async fn get(&self, schedule_id: &ScheduleId) -> Result<Option<TaskSchedule>, StoreError> {
        Ok(self.rows.read().await.get(schedule_id).cloned())
    }

    async fn list(&self) -> Result<Vec<TaskSchedule>, StoreError> {
        let mut all: Vec<TaskSchedule> = self.rows.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.schedule_id.cmp(&b.schedule_id)));
        Ok(all)
    }

    async fn delete(&self, schedule_id: &ScheduleId) -> Result<bool, StoreError> {
        Ok(self.rows.write().await.remove(schedule_id).is_some())
    }
}
