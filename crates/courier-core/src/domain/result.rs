//! TaskResult - persisted record of one webhook delivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ids::{ResultId, TaskId};
use super::invocation::TaskInvocation;
use super::outcome::ExecutionOutcome;
use super::status::TaskStatus;

/// One row per `task_id`. Created as `PENDING` on webhook receipt, completed
/// once after execution. A redelivery of the same `task_id` overwrites it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub id: ResultId,
    pub task_id: TaskId,
    pub task_name: String,
    pub function_path: String,
    pub status: TaskStatus,
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
    pub result: Option<Value>,
    pub traceback: Option<String>,
    pub date_created: DateTime<Utc>,
    pub date_done: Option<DateTime<Utc>>,
}

impl TaskResult {
    pub fn pending(
        id: ResultId,
        task_id: TaskId,
        invocation: &TaskInvocation,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            task_id,
            task_name: invocation.display_name(),
            function_path: invocation.path(),
            status: TaskStatus::Pending,
            args: invocation.args.clone(),
            kwargs: invocation.kwargs.clone(),
            result: None,
            traceback: None,
            date_created: now,
            date_done: None,
        }
    }

    /// Apply the terminal status and outcome.
    pub fn complete(&mut self, status: TaskStatus, outcome: &ExecutionOutcome, now: DateTime<Utc>) {
        self.status = status;
        match outcome {
            ExecutionOutcome::Success(value) => {
                self.result = Some(value.clone());
                self.traceback = None;
            }
            ExecutionOutcome::Failure(failure) => {
                self.result = None;
                self.traceback = Some(failure.trace.clone());
            }
        }
        self.date_done = Some(now);
    }

    pub fn is_done(&self) -> bool {
        self.date_done.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskFailure;
    use chrono::TimeZone;
    use serde_json::json;
    use ulid::Ulid;

    fn invocation() -> TaskInvocation {
        TaskInvocation::new("app.tasks", "add").with_args(vec![json!(2), json!(3)])
    }

    #[test]
    fn pending_copies_invocation() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let r = TaskResult::pending(ResultId::from(Ulid::new()), "msg_1".into(), &invocation(), now);
        assert_eq!(r.status, TaskStatus::Pending);
        assert_eq!(r.function_path, "app.tasks.add");
        assert_eq!(r.args, vec![json!(2), json!(3)]);
        assert!(!r.is_done());
    }

    #[test]
    fn complete_sets_result_or_traceback() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut r = TaskResult::pending(ResultId::from(Ulid::new()), "msg_1".into(), &invocation(), now);

        r.complete(TaskStatus::Success, &ExecutionOutcome::Success(json!(5)), now);
        assert_eq!(r.result, Some(json!(5)));
        assert!(r.traceback.is_none());
        assert_eq!(r.date_done, Some(now));

        let failure = TaskFailure::new("ValueError", "bad");
        r.complete(TaskStatus::ExecutionError, &ExecutionOutcome::Failure(failure), now);
        assert!(r.result.is_none());
        assert!(r.traceback.as_deref().unwrap().contains("ValueError"));
    }
}
