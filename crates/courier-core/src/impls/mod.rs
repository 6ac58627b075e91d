//! Impls - ports の実装
//!
//! - in-memory: 開発・テスト用（プロセス終了で消える）
//! - http: 配送サービスの REST API

pub mod http_delivery;
pub mod inmem_results;
pub mod inmem_schedules;
pub mod recording_delivery;

pub use self::http_delivery::HttpDeliveryService;
pub use self::inmem_results::InMemoryResultStore;
pub use self::inmem_schedules::InMemoryScheduleStore;
pub use self::recording_delivery::{RecordingDeliveryService, ScheduleCall};
