//! Result recorder
//!
//! - 受信時に `PENDING` 行を作り、実行後に終端ステータスで 1 回だけ更新
//! - 同じ `task_id` の再配送は同じ行を上書き
//! - ストア障害はログに残して握りつぶす（webhook の応答は変えない）

use std::sync::Arc;

use tracing::warn;

use crate::domain::{
    ExecutionOutcome, FailureOrigin, TaskId, TaskInvocation, TaskResult, TaskStatus,
};
use crate::ports::{Clock, IdGenerator, ResultStore};

/// Maps an outcome onto the terminal status recorded for it.
pub fn classify(outcome: &ExecutionOutcome) -> TaskStatus {
    match outcome {
        ExecutionOutcome::Success(_) => TaskStatus::Success,
        ExecutionOutcome::Failure(failure) => match failure.origin {
            FailureOrigin::Application => TaskStatus::ExecutionError,
            FailureOrigin::Internal => TaskStatus::InternalError,
            FailureOrigin::Unrecognized => TaskStatus::OtherError,
        },
    }
}

pub struct Recorder {
    store: Option<Arc<dyn ResultStore>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl Recorder {
    pub fn new(
        store: Option<Arc<dyn ResultStore>>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self { store, clock, ids }
    }

    /// Recording switched off: every call is a no-op and lookups say `UNKNOWN`.
    pub fn disabled(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self::new(None, clock, ids)
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Writes the `PENDING` row for a freshly received invocation.
    pub async fn begin(&self, task_id: TaskId, invocation: &TaskInvocation) -> TaskResult {
        let record = TaskResult::pending(
            self.ids.generate_result_id(),
            task_id,
            invocation,
            self.clock.now(),
        );
        self.save(record).await
    }

    /// Moves a row to its terminal status.
    pub async fn finish(
        &self,
        mut record: TaskResult,
        status: TaskStatus,
        outcome: &ExecutionOutcome,
    ) -> TaskResult {
        record.complete(status, outcome, self.clock.now());
        self.save(record).await
    }

    /// `begin` + `finish` in one go, for failures found before execution.
    pub async fn record(
        &self,
        task_id: TaskId,
        invocation: &TaskInvocation,
        outcome: &ExecutionOutcome,
    ) -> TaskResult {
        let record = self.begin(task_id, invocation).await;
        self.finish(record, classify(outcome), outcome).await
    }

    pub async fn lookup(&self, task_id: &TaskId) -> Option<TaskResult> {
        let store = self.store.as_ref()?;
        match store.get(task_id).await {
            Ok(found) => found,
            Err(e) => {
                warn!(%task_id, error = %e, "result lookup failed");
                None
            }
        }
    }

    /// Status for a task id; `UNKNOWN` when nothing was recorded.
    pub async fn status(&self, task_id: &TaskId) -> TaskStatus {
        self.lookup(task_id)
            .await
            .map(|r| r.status)
            .unwrap_or(TaskStatus::Unknown)
    }

    async fn save(&self, record: TaskResult) -> TaskResult {
        let Some(store) = &self.store else {
            return record;
        };
        let task_id = record.task_id.clone();
        let status = record.status;
        match store.upsert(record.clone()).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(%task_id, %status, error = %e, "failed to persist task result");
                record
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskFailure;
    use crate::impls::InMemoryResultStore;
    use crate::ports::{FixedClock, UlidGenerator};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use serde_json::json;

    fn recorder_with(store: Arc<InMemoryResultStore>) -> Recorder {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let ids = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
        Recorder::new(Some(store as Arc<dyn ResultStore>), clock, ids)
    }

    fn invocation() -> TaskInvocation {
        TaskInvocation::new("app.tasks", "add").with_args(vec![json!(2), json!(3)])
    }

    #[rstest]
    #[case(ExecutionOutcome::Success(json!(1)), TaskStatus::Success)]
    #[case(ExecutionOutcome::Failure(TaskFailure::new("ValueError", "bad")), TaskStatus::ExecutionError)]
    #[case(ExecutionOutcome::Failure(TaskFailure::internal("TaskError", "x")), TaskStatus::InternalError)]
    #[case(ExecutionOutcome::Failure(TaskFailure::unrecognized("Panic", "x")), TaskStatus::OtherError)]
    fn classify_by_origin(#[case] outcome: ExecutionOutcome, #[case] expected: TaskStatus) {
        assert_eq!(classify(&outcome), expected);
    }

    #[tokio::test]
    async fn begin_then_finish_updates_one_row() {
        let store = Arc::new(InMemoryResultStore::new());
        let recorder = recorder_with(Arc::clone(&store));

        let pending = recorder.begin("msg_1".into(), &invocation()).await;
        assert_eq!(recorder.status(&"msg_1".into()).await, TaskStatus::Pending);

        let outcome = ExecutionOutcome::Success(json!(5));
        let done = recorder.finish(pending, TaskStatus::Success, &outcome).await;
        assert_eq!(done.result, Some(json!(5)));
        assert_eq!(recorder.status(&"msg_1".into()).await, TaskStatus::Success);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn redelivery_overwrites_same_row() {
        let store = Arc::new(InMemoryResultStore::new());
        let recorder = recorder_with(Arc::clone(&store));

        let first = recorder
            .record("msg_1".into(), &invocation(), &ExecutionOutcome::Success(json!(5)))
            .await;
        let second = recorder
            .record("msg_1".into(), &invocation(), &ExecutionOutcome::Success(json!(5)))
            .await;

        assert_eq!(first.id, second.id);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_task_id_reports_unknown() {
        let recorder = recorder_with(Arc::new(InMemoryResultStore::new()));
        assert_eq!(recorder.status(&"nope".into()).await, TaskStatus::Unknown);
    }

    #[tokio::test]
    async fn disabled_recorder_stores_nothing() {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(Utc::now()));
        let ids = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
        let recorder = Recorder::disabled(clock, ids);

        let row = recorder
            .record("msg_1".into(), &invocation(), &ExecutionOutcome::Success(json!(5)))
            .await;
        assert_eq!(row.status, TaskStatus::Success);
        assert!(!recorder.is_enabled());
        assert_eq!(recorder.status(&"msg_1".into()).await, TaskStatus::Unknown);
    }
}
