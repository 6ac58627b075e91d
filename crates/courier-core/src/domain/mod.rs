//! Domain model (ids, envelope, options, status, outcome, records, errors).
//!
//! このモジュールはトランスポートや永続化を前提にしません。
//! 「何を保存し、何を配送するか」の形だけを定義します。

pub mod errors;
pub mod ids;
pub mod invocation;
pub mod options;
pub mod outcome;
pub mod result;
pub mod schedule;
pub mod status;

pub use errors::{PayloadError, SignatureError, TaskError};
pub use ids::{ResultId, ScheduleId, TaskId};
pub use invocation::{TaskInvocation, join_path, split_path};
pub use options::{ApplyOptions, Deduplication, DispatchOptions, TaskOptions};
pub use outcome::{ExecutionOutcome, FailureOrigin, TaskFailure};
pub use result::TaskResult;
pub use schedule::{ScheduleError, ScheduleSpec, TaskSchedule};
pub use status::TaskStatus;
