//! Webhook orchestrator
//!
//! 1 リクエスト = 1 トランザクション。最初に応答が決まった時点で終端します。
//!
//! ```text
//! verify ──✗──▶ 400 SignatureError
//!   │
//! decode ──✗──▶ 400 PayloadError
//!   │
//! resolve ─✗──▶ 200 + INTERNAL_ERROR を記録
//!   │
//! PENDING 記録 → execute → classify → 終端ステータス記録 → 200
//! ```

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{info, warn};

use super::decoder::decode;
use super::executor::execute;
use super::recorder::{Recorder, classify};
use super::resolver::Resolver;
use super::signature::SignatureVerifier;
use crate::domain::{
    ExecutionOutcome, SignatureError, TaskFailure, TaskId, TaskStatus,
};
use crate::typed::Arguments;

/// Inbound delivery, already stripped of its transport.
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    pub body: Vec<u8>,
    pub signature: Option<String>,
    /// URL the request was observed at; compared with the signed `sub`.
    pub url: String,
    /// Delivery-service message id, when the transport carries one.
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookResponse {
    pub status: u16,
    pub body: Value,
}

impl WebhookResponse {
    fn accepted(task_id: &TaskId, status: TaskStatus) -> Self {
        Self {
            status: 200,
            body: json!({ "task_id": task_id, "status": status }),
        }
    }

    fn rejected(error: String) -> Self {
        Self {
            status: 400,
            body: json!({ "error": error }),
        }
    }
}

pub struct WebhookOrchestrator {
    verifier: SignatureVerifier,
    resolver: Resolver,
    recorder: Arc<Recorder>,
}

impl WebhookOrchestrator {
    pub fn new(verifier: SignatureVerifier, resolver: Resolver, recorder: Arc<Recorder>) -> Self {
        Self {
            verifier,
            resolver,
            recorder,
        }
    }

    pub async fn handle(&self, request: WebhookRequest) -> WebhookResponse {
        let verified = match self.verifier.verify(
            &request.body,
            request.signature.as_deref(),
            &request.url,
        ) {
            Ok(verified) => verified,
            Err(SignatureError::Missing) => {
                return WebhookResponse::rejected("SignatureError: missing signature".into());
            }
            // 原因はログにだけ残す
            Err(SignatureError::Invalid(_)) => {
                return WebhookResponse::rejected("SignatureError: invalid signature".into());
            }
        };

        let invocation = match decode(&request.body) {
            Ok(invocation) => invocation,
            Err(e) => {
                warn!(error = %e, "rejected webhook payload");
                return WebhookResponse::rejected(format!("PayloadError: {e}"));
            }
        };

        let task_id = TaskId::new(request.message_id.unwrap_or(verified.claims.jti));
        let path = invocation.path();

        let task = match self
            .resolver
            .resolve(&invocation.module, &invocation.function)
        {
            Ok(task) => task,
            Err(e) => {
                warn!(%task_id, task = %path, error = %e, "task could not be resolved");
                let outcome = ExecutionOutcome::Failure(
                    TaskFailure::internal("TaskError", e.to_string()).in_frame(&path),
                );
                let row = self.recorder.record(task_id.clone(), &invocation, &outcome).await;
                return WebhookResponse::accepted(&task_id, row.status);
            }
        };

        let pending = self.recorder.begin(task_id.clone(), &invocation).await;
        let outcome = execute(task.as_ref(), Arguments::from_invocation(&invocation)).await;
        let status = classify(&outcome);
        self.recorder.finish(pending, status, &outcome).await;

        info!(%task_id, task = %path, %status, "webhook handled");
        WebhookResponse::accepted(&task_id, status)
    }
}
