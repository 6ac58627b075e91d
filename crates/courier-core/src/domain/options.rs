//! Dispatch options.
//!
//! 3 層構造:
//! - `TaskOptions`: 登録時のデフォルト
//! - `ApplyOptions`: 呼び出し時の上書き（すべて Option）
//! - `DispatchOptions`: マージ結果。配送サービスへの送信に使う

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Registration-time defaults attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOptions {
    pub name: Option<String>,
    pub max_retries: u32,
    pub deduplicated: bool,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            name: None,
            max_retries: DEFAULT_MAX_RETRIES,
            deduplicated: false,
        }
    }
}

impl TaskOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn deduplicated(mut self, deduplicated: bool) -> Self {
        self.deduplicated = deduplicated;
        self
    }
}

/// Call-time overrides for `apply_async`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Seconds to wait before delivery. `None` means immediate.
    pub countdown: Option<u64>,
    pub max_retries: Option<u32>,
    pub deduplicated: Option<bool>,
    pub name: Option<String>,
    /// Caller-supplied deduplication key; wins over the content hash.
    pub deduplication_id: Option<String>,
}

impl ApplyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn countdown(mut self, seconds: u64) -> Self {
        self.countdown = Some(seconds);
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn deduplicated(mut self, deduplicated: bool) -> Self {
        self.deduplicated = Some(deduplicated);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn deduplication_id(mut self, key: impl Into<String>) -> Self {
        self.deduplication_id = Some(key.into());
        self
    }
}

/// How a message is deduplicated by the delivery service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "key", rename_all = "snake_case")]
pub enum Deduplication {
    ContentHash,
    CallerKey(String),
}

/// Effective options after merging registration defaults with call overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOptions {
    pub countdown: Option<u64>,
    pub max_retries: u32,
    pub deduplicated: bool,
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deduplication: Option<Deduplication>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self::merge(&TaskOptions::default(), ApplyOptions::default())
    }
}

impl DispatchOptions {
    pub fn merge(defaults: &TaskOptions, call: ApplyOptions) -> Self {
        let deduplicated = call.deduplicated.unwrap_or(defaults.deduplicated);
        let deduplication = match call.deduplication_id {
            Some(key) => Some(Deduplication::CallerKey(key)),
            None if deduplicated => Some(Deduplication::ContentHash),
            None => None,
        };
        Self {
            countdown: call.countdown,
            max_retries: call.max_retries.unwrap_or(defaults.max_retries),
            deduplicated: deduplicated || deduplication.is_some(),
            name: call.name.or_else(|| defaults.name.clone()),
            deduplication,
        }
    }

    /// Delay header value understood by the delivery service (`"60s"`).
    pub fn delay_header(&self) -> Option<String> {
        self.countdown.map(|s| format!("{s}s"))
    }

    /// Options as carried inside the envelope.
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}
