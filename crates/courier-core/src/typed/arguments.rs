//! Arguments - 位置引数 / キーワード引数と Task 型の相互変換
//!
//! - dispatch 側: `Arguments::from_task` で Task を args/kwargs に分解
//!   （シリアライズは送信前にここで行い、失敗は `TaskError` として同期的に返す）
//! - webhook 側: `Arguments::bind` で args/kwargs を Task 型に束縛
//!   （arity / 型の不一致は `BindError`、Executor が失敗として記録する）

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::task::Task;
use crate::domain::{TaskError, TaskInvocation};

/// Argument-binding failure, surfaced as an execution failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("takes {expected} positional arguments but {given} were given")]
    TooManyPositional { expected: usize, given: usize },

    #[error("got multiple values for argument '{0}'")]
    MultipleValues(String),

    #[error("{0}")]
    Invalid(String),
}

/// Positional + keyword arguments as JSON values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(args: Vec<Value>, kwargs: Map<String, Value>) -> Self {
        Self { args, kwargs }
    }

    pub fn from_invocation(invocation: &TaskInvocation) -> Self {
        Self::from_parts(invocation.args.clone(), invocation.kwargs.clone())
    }

    /// Appends a positional argument, serializing it now.
    pub fn arg<V: Serialize + ?Sized>(mut self, value: &V) -> Result<Self, TaskError> {
        self.args.push(to_json(value)?);
        Ok(self)
    }

    /// Sets a keyword argument, serializing it now.
    pub fn kwarg<V: Serialize + ?Sized>(
        mut self,
        name: impl Into<String>,
        value: &V,
    ) -> Result<Self, TaskError> {
        self.kwargs.insert(name.into(), to_json(value)?);
        Ok(self)
    }

    /// Splits a task value into arguments.
    ///
    /// Fields named in `T::PARAMS` become positional, in order, up to the first
    /// one that is absent; every other field is passed by keyword.
    pub fn from_task<T: Task>(task: &T) -> Result<Self, TaskError> {
        let mut fields = match to_json(task)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(TaskError::Serialization(format!(
                    "task {} must serialize to a JSON object, got {}",
                    T::path(),
                    json_type(&other)
                )));
            }
        };

        let mut args = Vec::new();
        for param in T::PARAMS {
            match fields.remove(*param) {
                Some(value) => args.push(value),
                None => break,
            }
        }
        Ok(Self::from_parts(args, fields))
    }

    /// Binds arguments onto `T`'s fields.
    pub fn bind<T: Task>(self) -> Result<T, BindError> {
        let params = T::PARAMS;
        if self.args.len() > params.len() {
            return Err(BindError::TooManyPositional {
                expected: params.len(),
                given: self.args.len(),
            });
        }

        let mut fields: Map<String, Value> = params
            .iter()
            .zip(self.args)
            .map(|(name, value)| (name.to_string(), value))
            .collect();

        for (name, value) in self.kwargs {
            if fields.contains_key(&name) {
                return Err(BindError::MultipleValues(name));
            }
            fields.insert(name, value);
        }

        serde_json::from_value(Value::Object(fields)).map_err(|e| BindError::Invalid(e.to_string()))
    }
}

fn to_json<V: Serialize + ?Sized>(value: &V) -> Result<Value, TaskError> {
    serde_json::to_value(value).map_err(|e| TaskError::Serialization(e.to_string()))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
