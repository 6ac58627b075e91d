//! TaskInvocation - wire / persisted envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Envelope describing which registered task to run and with what arguments.
///
/// `module` + `function` together form the dotted task path
/// (`app.tasks` + `add` → `app.tasks.add`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInvocation {
    pub module: String,
    pub function: String,

    #[serde(default)]
    pub args: Vec<Value>,

    #[serde(default)]
    pub kwargs: Map<String, Value>,

    /// Human readable label (`TaskOptions::name`), falls back to the path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_name: Option<String>,

    #[serde(default)]
    pub options: Map<String, Value>,
}

impl TaskInvocation {
    pub fn new(module: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            function: function.into(),
            args: Vec::new(),
            kwargs: Map::new(),
            task_name: None,
            options: Map::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn with_kwargs(mut self, kwargs: Map<String, Value>) -> Self {
        self.kwargs = kwargs;
        self
    }

    pub fn with_task_name(mut self, name: impl Into<String>) -> Self {
        self.task_name = Some(name.into());
        self
    }

    pub fn with_options(mut self, options: Map<String, Value>) -> Self {
        self.options = options;
        self
    }

    /// Dotted path, e.g. `app.tasks.add`.
    pub fn path(&self) -> String {
        join_path(&self.module, &self.function)
    }

    /// Label stored with results.
    pub fn display_name(&self) -> String {
        self.task_name.clone().unwrap_or_else(|| self.path())
    }
}

pub fn join_path(module: &str, function: &str) -> String {
    format!("{module}.{function}")
}

/// Splits `app.tasks.add` into (`app.tasks`, `add`).
///
/// Returns `None` when there is no module part.
pub fn split_path(path: &str) -> Option<(&str, &str)> {
    let (module, function) = path.rsplit_once('.')?;
    if module.is_empty() || function.is_empty() {
        return None;
    }
    Some((module, function))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn defaults_fill_missing_sequences() {
        let inv: TaskInvocation =
            serde_json::from_value(json!({"module": "app.tasks", "function": "add"})).unwrap();
        assert!(inv.args.is_empty());
        assert!(inv.kwargs.is_empty());
        assert!(inv.options.is_empty());
        assert_eq!(inv.path(), "app.tasks.add");
        assert_eq!(inv.display_name(), "app.tasks.add");
    }

    #[test]
    fn task_name_is_omitted_when_absent() {
        let inv = TaskInvocation::new("app.tasks", "add");
        let v = serde_json::to_value(&inv).unwrap();
        assert!(v.get("task_name").is_none());

        let inv = inv.with_task_name("Math adder");
        assert_eq!(inv.display_name(), "Math adder");
    }

    #[rstest]
    #[case("app.tasks.add", Some(("app.tasks", "add")))]
    #[case("tasks.add", Some(("tasks", "add")))]
    #[case("add", None)]
    #[case(".add", None)]
    #[case("app.", None)]
    fn split_path_cases(#[case] path: &str, #[case] expected: Option<(&str, &str)>) {
        assert_eq!(split_path(path), expected);
    }
}
