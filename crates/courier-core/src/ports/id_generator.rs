//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（Clock の時刻 + 乱数）

use crate::domain::ResultId;
use crate::ports::Clock;
use ulid::Ulid;

pub trait IdGenerator: Send + Sync {
    fn generate_result_id(&self) -> ResultId;
}

/// ULID generator whose timestamp part comes from a `Clock`, so ids sort by
/// creation time even under a `FixedClock`.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_result_id(&self) -> ResultId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        ResultId::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
