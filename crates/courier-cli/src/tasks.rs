//! Tasks served by the bundled binary.
//!
//! 本番ではアプリ側の crate が自分のタスクを登録します。ここにあるのは
//! `serve` / `dispatch` をそのまま試せるようにするための最小セットです。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use courier_core::domain::{TaskFailure, TaskOptions};
use courier_core::typed::{Handler, RegistryError, Task, TaskRegistry};

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Add {
    pub a: i64,
    pub b: i64,
}

impl Task for Add {
    const MODULE: &'static str = "math";
    const FUNCTION: &'static str = "add";
    const PARAMS: &'static [&'static str] = &["a", "b"];
    type Output = i64;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Divide {
    pub a: i64,
    pub b: i64,
}

impl Task for Divide {
    const MODULE: &'static str = "math";
    const FUNCTION: &'static str = "divide";
    const PARAMS: &'static [&'static str] = &["a", "b"];
    type Output = i64;
}

pub struct DivideHandler;

#[async_trait]
impl Handler<Divide> for DivideHandler {
    async fn handle(&self, task: Divide) -> Result<i64, TaskFailure> {
        task.a
            .checked_div(task.b)
            .ok_or_else(|| TaskFailure::new("ZeroDivisionError", "division by zero"))
    }
}

/// `greet(name, greeting="Hello")`
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Greet {
    pub name: String,
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

fn default_greeting() -> String {
    "Hello".to_string()
}

impl Task for Greet {
    const MODULE: &'static str = "demo.greetings";
    const FUNCTION: &'static str = "greet";
    const PARAMS: &'static [&'static str] = &["name", "greeting"];
    type Output = String;
}

pub fn registry() -> Result<TaskRegistry, RegistryError> {
    let mut registry = TaskRegistry::new();
    registry.register::<Add, _>(
        |t: Add| async move { Ok::<_, TaskFailure>(t.a + t.b) },
        TaskOptions::named("Math adder"),
    )?;
    registry.register::<Divide, _>(DivideHandler, TaskOptions::default().with_max_retries(0))?;
    registry.register::<Greet, _>(
        |t: Greet| async move { Ok::<_, TaskFailure>(format!("{}, {}!", t.greeting, t.name)) },
        TaskOptions::default().deduplicated(true),
    )?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::typed::Arguments;
    use serde_json::json;

    #[test]
    fn registry_lists_all_tasks() {
        let registry = registry().unwrap();
        assert_eq!(
            registry.discover(),
            vec![
                ("demo.greetings.greet".to_string(), "demo.greetings.greet".to_string()),
                ("math.add".to_string(), "Math adder".to_string()),
                ("math.divide".to_string(), "math.divide".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn divide_by_zero_fails() {
        let task = registry().unwrap().get("math.divide").unwrap();
        let err = task
            .call(Arguments::from_parts(vec![json!(1), json!(0)], Default::default()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, "ZeroDivisionError");
    }

    #[tokio::test]
    async fn greet_uses_default_keyword() {
        let task = registry().unwrap().get("demo.greetings.greet").unwrap();
        let out = task
            .call(Arguments::from_parts(vec![json!("Ada")], Default::default()))
            .await
            .unwrap();
        assert_eq!(out, json!("Hello, Ada!"));
    }
}
