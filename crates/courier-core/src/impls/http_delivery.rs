//! HttpDeliveryService - 配送サービスの REST API クライアント
//!
//! | 操作 | リクエスト |
//! |------|-----------|
//! | publish | `POST /v2/publish/{destination}` |
//! | schedule 作成/更新 | `POST /v2/schedules/{destination}` |
//! | pause / resume | `POST /v2/schedules/{id}/pause` / `resume` |
//! | delete | `DELETE /v2/schedules/{id}` |
//!
//! オプションはすべて `Upstash-*` ヘッダで渡します。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::domain::{ScheduleId, TaskId};
use crate::ports::{DeliveryError, DeliveryService, PublishRequest, ScheduleRequest};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    message_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleResponse {
    schedule_id: String,
}

pub struct HttpDeliveryService {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpDeliveryService {
    pub fn new(settings: &Settings) -> Result<Self, DeliveryError> {
        if let Some(url) = settings.base_url_override() {
            warn!(url, "delivery service URL overridden; use only for local development");
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.delivery_base_url().to_string(),
            token: settings.token().to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v2/{path}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, DeliveryError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl DeliveryService for HttpDeliveryService {
    async fn publish(&self, request: PublishRequest) -> Result<TaskId, DeliveryError> {
        let mut builder = self
            .client
            .post(self.url(&format!("publish/{}", request.destination)))
            .header("Upstash-Retries", request.retries.to_string())
            .json(&request.body);
        if let Some(delay) = &request.delay {
            builder = builder.header("Upstash-Delay", delay);
        }
        if let Some(key) = &request.deduplication_id {
            builder = builder.header("Upstash-Deduplication-Id", key);
        }

        let response: PublishResponse = self
            .send(builder)
            .await?
            .json()
            .await
            .map_err(|e| DeliveryError::Decode(e.to_string()))?;
        debug!(message_id = %response.message_id, "message published");
        Ok(TaskId::new(response.message_id))
    }

    async fn upsert_schedule(&self, request: ScheduleRequest) -> Result<ScheduleId, DeliveryError> {
        let mut builder = self
            .client
            .post(self.url(&format!("schedules/{}", request.destination)))
            .header("Upstash-Cron", &request.cron)
            .header("Upstash-Retries", request.retries.to_string())
            .header("Upstash-Timeout", &request.timeout)
            .json(&request.body);
        if let Some(id) = &request.schedule_id {
            builder = builder.header("Upstash-Schedule-Id", id.as_str());
        }

        let response: ScheduleResponse = self
            .send(builder)
            .await?
            .json()
            .await
            .map_err(|e| DeliveryError::Decode(e.to_string()))?;
        Ok(ScheduleId::new(response.schedule_id))
    }

    async fn pause_schedule(&self, schedule_id: &ScheduleId) -> Result<(), DeliveryError> {
        let url = self.url(&format!("schedules/{schedule_id}/pause"));
        self.send(self.client.post(url)).await?;
        Ok(())
    }

    async fn resume_schedule(&self, schedule_id: &ScheduleId) -> Result<(), DeliveryError> {
        let url = self.url(&format!("schedules/{schedule_id}/resume"));
        self.send(self.client.post(url)).await?;
        Ok(())
    }

    async fn delete_schedule(&self, schedule_id: &ScheduleId) -> Result<(), DeliveryError> {
        let url = self.url(&format!("schedules/{schedule_id}"));
        self.send(self.client.delete(url)).await?;
        Ok(())
    }
}
