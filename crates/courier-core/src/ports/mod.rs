//! Ports - 抽象化レイヤー
//!
//! 外部システム（配送サービス、結果ストア、時刻）へのインターフェースです。
//! 実装は `impls` に置きます。

pub mod clock;
pub mod delivery;
pub mod id_generator;
pub mod result_store;
pub mod schedule_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::delivery::{DeliveryError, DeliveryService, PublishRequest, ScheduleRequest};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::result_store::{ResultStore, StoreError};
pub use self::schedule_store::ScheduleStore;
