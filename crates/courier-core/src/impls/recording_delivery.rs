//! RecordingDeliveryService - 送信内容を記録するだけの配送サービス
//!
//! ネットワークに出ずに dispatch / schedule 同期を検証するためのものです。
//! `fail_with` を設定すると以降の呼び出しはそのエラーを返します。

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ScheduleId, TaskId};
use crate::ports::{DeliveryError, DeliveryService, PublishRequest, ScheduleRequest};

pub const DEFAULT_MESSAGE_ID: &str = "test-id-123";

#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleCall {
    Upsert(ScheduleRequest),
    Pause(ScheduleId),
    Resume(ScheduleId),
    Delete(ScheduleId),
}

pub struct RecordingDeliveryService {
    message_id: String,
    published: Mutex<Vec<PublishRequest>>,
    schedule_calls: Mutex<Vec<ScheduleCall>>,
    failure: Mutex<Option<DeliveryError>>,
    next_schedule: AtomicU64,
}

impl RecordingDeliveryService {
    pub fn new() -> Self {
        Self::with_message_id(DEFAULT_MESSAGE_ID)
    }

    /// Every publish answers with this id.
    pub fn with_message_id(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            published: Mutex::new(Vec::new()),
            schedule_calls: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            next_schedule: AtomicU64::new(1),
        }
    }

    pub async fn fail_with(&self, error: DeliveryError) {
        *self.failure.lock().await = Some(error);
    }

    pub async fn published(&self) -> Vec<PublishRequest> {
        self.published.lock().await.clone()
    }

    pub async fn schedule_calls(&self) -> Vec<ScheduleCall> {
        self.schedule_calls.lock().await.clone()
    }

    async fn check(&self) -> Result<(), DeliveryError> {
        match self.failure.lock().await.as_ref() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn push_schedule_call(&self, call: ScheduleCall) -> Result<(), DeliveryError> {
        self.check().await?;
        self.schedule_calls.lock().await.push(call);
        Ok(())
    }
}

impl Default for RecordingDeliveryService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliveryService for RecordingDeliveryService {
    async fn publish(&self, request: PublishRequest) -> Result<TaskId, DeliveryError> {
        self.check().await?;
        self.published.lock().await.push(request);
        Ok(TaskId::new(self.message_id.clone()))
    }

    async fn upsert_schedule(&self, request: ScheduleRequest) -> Result<ScheduleId, DeliveryError> {
        let schedule_id = match &request.schedule_id {
            Some(id) => id.clone(),
            None => {
                let n = self.next_schedule.fetch_add(1, Ordering::Relaxed);
                ScheduleId::new(format!("scd_{n}"))
            }
        };
        self.push_schedule_call(ScheduleCall::Upsert(request)).await?;
        Ok(schedule_id)
    }

    async fn pause_schedule(&self, schedule_id: &ScheduleId) -> Result<(), DeliveryError> {
        self.push_schedule_call(ScheduleCall::Pause(schedule_id.clone())).await
    }

    async fn resume_schedule(&self, schedule_id: &ScheduleId) -> Result<(), DeliveryError> {
        self.push_schedule_call(ScheduleCall::Resume(schedule_id.clone())).await
    }

    async fn delete_schedule(&self, schedule_id: &ScheduleId) -> Result<(), DeliveryError> {
        self.push_schedule_call(ScheduleCall::Delete(schedule_id.clone())).await
    }
}
