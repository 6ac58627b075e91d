//! TaskSchedule - 外部スケジューラと同期する定期実行ルール
//!
//! ローカルのレコードはキャッシュ（ミラー）であり、正本は外部スケジューラ側です。
//!
//! # 検証
//! - cron: 5 フィールド（分 時 日 月 曜日）
//! - retries: 0..=5
//! - timeout: `^\d+[smhd]$`（例: `30s`, `5m`）

use std::sync::LazyLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::ids::ScheduleId;

pub const MAX_SCHEDULE_RETRIES: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },

    #[error("invalid duration string '{0}', expected e.g. 30s, 5m, 1h, 1d")]
    InvalidDuration(String),

    #[error("retries must be between 0 and {max}, got {0}", max = MAX_SCHEDULE_RETRIES)]
    InvalidRetries(u32),

    #[error("Task '{name}' not found. Available tasks: {}", .available.join(", "))]
    UnknownTask { name: String, available: Vec<String> },

    #[error("schedule '{0}' not found")]
    NotFound(ScheduleId),

    #[error("scheduler sync failed: {0}")]
    Sync(String),

    #[error("schedule store failed: {0}")]
    Store(String),
}

/// Local mirror of one recurring dispatch rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSchedule {
    pub schedule_id: ScheduleId,
    pub name: String,
    /// Dotted task path.
    pub task_name: String,
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
    pub cron: String,
    pub retries: u32,
    pub timeout: String,
    pub is_active: bool,
    pub is_paused: bool,
    pub active_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub resumed_at: Option<DateTime<Utc>>,
}

/// Input for creating or updating a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSpec {
    pub name: String,
    pub task_name: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
    pub cron: String,
    #[serde(default)]
    pub retries: u32,
    #[serde(default = "default_timeout")]
    pub timeout: String,
}

fn default_timeout() -> String {
    "60s".to_string()
}

impl ScheduleSpec {
    pub fn new(name: impl Into<String>, task_name: impl Into<String>, cron: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            task_name: task_name.into(),
            args: Vec::new(),
            kwargs: Map::new(),
            cron: cron.into(),
            retries: 0,
            timeout: default_timeout(),
        }
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = timeout.into();
        self
    }

    /// Field-level checks that need no registry.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        validate_cron(&self.cron)?;
        parse_duration(&self.timeout)?;
        if self.retries > MAX_SCHEDULE_RETRIES {
            return Err(ScheduleError::InvalidRetries(self.retries));
        }
        Ok(())
    }
}

/// (name, min, max) for the five cron fields.
const CRON_FIELDS: [(&str, u32, u32); 5] = [
    ("minute", 0, 59),
    ("hour", 0, 23),
    ("day of month", 1, 31),
    ("month", 1, 12),
    ("day of week", 0, 7),
];

/// One comma-separated item of a cron field: `*`, `n` or `a-b`, then an optional `/step`.
static CRON_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\*)|(\d+)(?:-(\d+))?)(?:/(\d+))?$").expect("valid cron item pattern")
});

static DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([smhd])$").expect("valid duration pattern"));

/// Validates a numeric 5-field cron expression.
///
/// Each field accepts `*`, `n`, `a-b`, optional `/step`, and comma lists.
pub fn validate_cron(expr: &str) -> Result<(), ScheduleError> {
    let invalid = |reason: String| ScheduleError::InvalidCron {
        expr: expr.to_string(),
        reason,
    };

    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != CRON_FIELDS.len() {
        return Err(invalid(format!("expected 5 fields, got {}", fields.len())));
    }

    for (field, (name, min, max)) in fields.iter().zip(CRON_FIELDS) {
        for item in field.split(',') {
            validate_cron_item(item, min, max).map_err(|r| invalid(format!("{name}: {r}")))?;
        }
    }
    Ok(())
}

fn validate_cron_item(item: &str, min: u32, max: u32) -> Result<(), String> {
    let caps = CRON_ITEM
        .captures(item)
        .ok_or_else(|| format!("bad item '{item}'"))?;

    let number = |s: &str| -> Result<u32, String> {
        s.parse().map_err(|_| format!("bad value '{s}'"))
    };

    if let Some(step) = caps.get(4)
        && number(step.as_str())? == 0
    {
        return Err("step must be positive".to_string());
    }

    // `*` は範囲チェック不要
    let Some(lo) = caps.get(2) else {
        return Ok(());
    };

    let in_range = |v: u32| -> Result<u32, String> {
        if v < min || v > max {
            return Err(format!("{v} out of range {min}-{max}"));
        }
        Ok(v)
    };

    let lo = in_range(number(lo.as_str())?)?;
    if let Some(hi) = caps.get(3) {
        let hi = in_range(number(hi.as_str())?)?;
        if lo > hi {
            return Err(format!("range {lo}-{hi} is reversed"));
        }
    }
    Ok(())
}

/// Parses `30s`, `5m`, `2h`, `1d`.
pub fn parse_duration(s: &str) -> Result<Duration, ScheduleError> {
    let invalid = || ScheduleError::InvalidDuration(s.to_string());
    let caps = DURATION.captures(s).ok_or_else(invalid)?;
    let n: u64 = caps[1].parse().map_err(|_| invalid())?;
    let unit_secs = match &caps[2] {
        "s" => 1,
        "m" => 60,
        "h" => 3_600,
        _ => 86_400,
    };
    let secs = n.checked_mul(unit_secs).ok_or_else(invalid)?;
    Ok(Duration::from_secs(secs))
}
