//! DeliveryService port - 外部のメッセージ配送サービス
//!
//! 耐久性・キューイング・リトライは配送サービス側の責務です。
//! この crate は「送る」「スケジュールを同期する」だけを行います。

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{ScheduleId, TaskId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("delivery service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

/// One message publish.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishRequest {
    /// Callback URL the service will POST the body to.
    pub destination: String,
    pub body: Value,
    /// Delay before first delivery, e.g. `"60s"`.
    pub delay: Option<String>,
    pub retries: u32,
    pub deduplication_id: Option<String>,
}

/// Create or update a recurring schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRequest {
    /// Present when updating an existing schedule.
    pub schedule_id: Option<ScheduleId>,
    pub destination: String,
    pub body: Value,
    pub cron: String,
    pub retries: u32,
    pub timeout: String,
}

#[async_trait]
pub trait DeliveryService: Send + Sync {
    /// Publishes a message; returns the service's message id.
    async fn publish(&self, request: PublishRequest) -> Result<TaskId, DeliveryError>;

    async fn upsert_schedule(&self, request: ScheduleRequest) -> Result<ScheduleId, DeliveryError>;

    async fn pause_schedule(&self, schedule_id: &ScheduleId) -> Result<(), DeliveryError>;

    async fn resume_schedule(&self, schedule_id: &ScheduleId) -> Result<(), DeliveryError>;

    async fn delete_schedule(&self, schedule_id: &ScheduleId) -> Result<(), DeliveryError>;
}
