//! DispatchClient - タスク呼び出しを配送サービスへのメッセージにする
//!
//! # 学習ポイント
//! - 引数は送信前にシリアライズする。失敗すれば `TaskError::Serialization` で
//!   何も publish されない
//! - 呼び出し側に返るのはメッセージ id だけ。結果は記録された `TaskResult` で見る

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::info;

use crate::config::Settings;
use crate::domain::{
    ApplyOptions, Deduplication, DispatchOptions, TaskError, TaskId, TaskInvocation, TaskOptions,
    split_path,
};
use crate::ports::{DeliveryService, PublishRequest};
use crate::typed::{Arguments, TaskRegistry};

/// Returned by `delay` / `apply_async`. Carries only the message id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsyncHandle {
    task_id: TaskId,
}

impl AsyncHandle {
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn into_task_id(self) -> TaskId {
        self.task_id
    }
}

pub struct DispatchClient {
    delivery: Arc<dyn DeliveryService>,
    callback_url: String,
    registry: Option<Arc<TaskRegistry>>,
}

impl DispatchClient {
    pub fn new(settings: &Settings, delivery: Arc<dyn DeliveryService>) -> Self {
        Self {
            delivery,
            callback_url: settings.callback_url(),
            registry: None,
        }
    }

    /// Registration defaults are looked up here for path-based dispatch.
    pub fn with_registry(mut self, registry: Arc<TaskRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    /// Publishes one invocation of `module.function`.
    pub async fn submit(
        &self,
        module: &str,
        function: &str,
        arguments: Arguments,
        defaults: &TaskOptions,
        call: ApplyOptions,
    ) -> Result<AsyncHandle, TaskError> {
        let options = DispatchOptions::merge(defaults, call);
        let mut invocation = TaskInvocation::new(module, function)
            .with_args(arguments.args)
            .with_kwargs(arguments.kwargs)
            .with_options(options.to_map());
        if let Some(name) = &options.name {
            invocation = invocation.with_task_name(name.clone());
        }

        let body = serde_json::to_value(&invocation)
            .map_err(|e| TaskError::Serialization(e.to_string()))?;
        let deduplication_id = match &options.deduplication {
            Some(Deduplication::ContentHash) => Some(content_hash(&invocation)?),
            Some(Deduplication::CallerKey(key)) => Some(key.clone()),
            None => None,
        };

        let request = PublishRequest {
            destination: self.callback_url.clone(),
            body,
            delay: options.delay_header(),
            retries: options.max_retries,
            deduplication_id,
        };
        let task_id = self
            .delivery
            .publish(request)
            .await
            .map_err(|e| TaskError::Delivery(e.to_string()))?;

        info!(%task_id, task = %invocation.path(), "task dispatched");
        Ok(AsyncHandle { task_id })
    }

    /// Dispatch by dotted path with call-time options.
    pub async fn apply_async(
        &self,
        path: &str,
        arguments: Arguments,
        options: ApplyOptions,
    ) -> Result<AsyncHandle, TaskError> {
        let (module, function) =
            split_path(path).ok_or_else(|| TaskError::ModuleNotFound(path.to_string()))?;
        let defaults = self
            .registry
            .as_ref()
            .and_then(|registry| registry.get(path))
            .map(|task| task.options().clone())
            .unwrap_or_default();
        self.submit(module, function, arguments, &defaults, options).await
    }

    pub async fn delay(&self, path: &str, arguments: Arguments) -> Result<AsyncHandle, TaskError> {
        self.apply_async(path, arguments, ApplyOptions::default()).await
    }
}

/// Hex sha256 over the identifying part of an invocation.
///
/// Options are left out so that a retried call with a different countdown
/// still collapses onto the same message.
pub fn content_hash(invocation: &TaskInvocation) -> Result<String, TaskError> {
    let identity = serde_json::json!({
        "module": invocation.module,
        "function": invocation.function,
        "args": invocation.args,
        "kwargs": invocation.kwargs,
    });
    let bytes =
        serde_json::to_vec(&identity).map_err(|e| TaskError::Serialization(e.to_string()))?;
    Ok(hex::encode(Sha256::digest(bytes)))
}
