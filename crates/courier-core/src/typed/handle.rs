//! TaskHandle - 登録時に返される dispatch 可能なラッパー
//!
//! - `call`: プロセス内で直接実行（パイプラインを通らない）
//! - `delay` / `apply_async`: 配送サービスへ送信し `AsyncHandle` を返す

use std::sync::Arc;

use super::arguments::Arguments;
use super::handler::Handler;
use super::task::Task;
use crate::app::dispatch::{AsyncHandle, DispatchClient};
use crate::domain::{ApplyOptions, TaskError, TaskFailure, TaskOptions};

pub struct TaskHandle<T: Task> {
    handler: Arc<dyn Handler<T>>,
    options: TaskOptions,
}

impl<T: Task> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            options: self.options.clone(),
        }
    }
}

impl<T: Task> TaskHandle<T> {
    pub(crate) fn new(handler: Arc<dyn Handler<T>>, options: TaskOptions) -> Self {
        Self { handler, options }
    }

    pub fn path(&self) -> String {
        T::path()
    }

    pub fn options(&self) -> &TaskOptions {
        &self.options
    }

    /// Runs the task in-process and returns its own return value.
    pub async fn call(&self, task: T) -> Result<T::Output, TaskFailure> {
        self.handler.handle(task).await
    }

    pub async fn delay(&self, client: &DispatchClient, task: &T) -> Result<AsyncHandle, TaskError> {
        self.apply_async(client, task, ApplyOptions::default()).await
    }

    pub async fn apply_async(
        &self,
        client: &DispatchClient,
        task: &T,
        options: ApplyOptions,
    ) -> Result<AsyncHandle, TaskError> {
        let arguments = Arguments::from_task(task)?;
        self.apply_async_with(client, arguments, options).await
    }

    /// Dispatch with hand-built arguments (e.g. extra keyword arguments).
    pub async fn apply_async_with(
        &self,
        client: &DispatchClient,
        arguments: Arguments,
        options: ApplyOptions,
    ) -> Result<AsyncHandle, TaskError> {
        client
            .submit(T::MODULE, T::FUNCTION, arguments, &self.options, options)
            .await
    }
}
