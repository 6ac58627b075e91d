//! Executor - 解決済みタスクを 1 回実行する
//!
//! どんな失敗も呼び出し元へ伝播させず、必ず `ExecutionOutcome` として返します。
//! handler 内の panic も捕捉して `OTHER_ERROR` 扱いの failure に変換します。

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{debug, warn};

use crate::domain::{ExecutionOutcome, TaskFailure};
use crate::typed::{Arguments, DynTask};

pub async fn execute(task: &dyn DynTask, arguments: Arguments) -> ExecutionOutcome {
    let path = task.path();
    debug!(task = path, "executing task");

    match AssertUnwindSafe(task.call(arguments)).catch_unwind().await {
        Ok(Ok(value)) => ExecutionOutcome::Success(value),
        Ok(Err(failure)) => {
            warn!(task = path, error = %failure, "task failed");
            ExecutionOutcome::Failure(failure.in_frame(path))
        }
        Err(panic) => {
            let message = panic_message(&*panic);
            warn!(task = path, panic = %message, "task panicked");
            ExecutionOutcome::Failure(TaskFailure::unrecognized("Panic", message).in_frame(path))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}
