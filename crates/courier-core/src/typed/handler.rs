//! Handler trait - Task を実行する Handler の定義
//!
//! # 二層構造
//! - `Handler<T>`: 型付き。`T` しか受け取れない
//! - `DynTask`: object-safe。args/kwargs（JSON）を受け取り JSON を返す
//!
//! `TypedTask<T>` が `Handler<T>` を `DynTask` に型消去します。

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::arguments::Arguments;
use super::task::Task;
use crate::domain::{TaskFailure, TaskOptions};

/// Runs one task value.
///
/// Implement it on a struct, or pass an async closure:
///
/// ```ignore
/// registry.register::<Add, _>(
///     |t: Add| async move { Ok::<_, TaskFailure>(t.a + t.b) },
///     TaskOptions::default(),
/// )?;
/// ```
#[async_trait]
pub trait Handler<T: Task>: Send + Sync {
    async fn handle(&self, task: T) -> Result<T::Output, TaskFailure>;
}

#[async_trait]
impl<T, F, Fut> Handler<T> for F
where
    T: Task,
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T::Output, TaskFailure>> + Send + 'static,
{
    async fn handle(&self, task: T) -> Result<T::Output, TaskFailure> {
        (self)(task).await
    }
}

/// Object-safe view of a registered task.
#[async_trait]
pub trait DynTask: Send + Sync {
    fn path(&self) -> &str;

    fn options(&self) -> &TaskOptions;

    /// Label shown in results and listings.
    fn label(&self) -> &str {
        self.options().name.as_deref().unwrap_or_else(|| self.path())
    }

    /// Binds the arguments and runs the handler.
    ///
    /// Binding failures come back as `ArgumentError`.
    async fn call(&self, arguments: Arguments) -> Result<Value, TaskFailure>;
}

pub struct TypedTask<T: Task> {
    handler: Arc<dyn Handler<T>>,
    options: TaskOptions,
    path: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Task> TypedTask<T> {
    pub fn new(handler: Arc<dyn Handler<T>>, options: TaskOptions) -> Self {
        Self {
            handler,
            options,
            path: T::path(),
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Task> DynTask for TypedTask<T> {
    fn path(&self) -> &str {
        &self.path
    }

    fn options(&self) -> &TaskOptions {
        &self.options
    }

    async fn call(&self, arguments: Arguments) -> Result<Value, TaskFailure> {
        let task: T = arguments
            .bind()
            .map_err(|e| TaskFailure::new("ArgumentError", e.to_string()))?;
        let output = self.handler.handle(task).await?;
        serde_json::to_value(output)
            .map_err(|e| TaskFailure::new("SerializationError", format!("return value: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed::task::fixtures::{Add, AddHandler};
    use serde_json::json;

    fn add_task() -> TypedTask<Add> {
        TypedTask::new(Arc::new(AddHandler), TaskOptions::named("Math adder"))
    }

    #[tokio::test]
    async fn typed_task_binds_and_returns_json() {
        let task = add_task();
        let out = task
            .call(Arguments::from_parts(vec![json!(2), json!(3)], Default::default()))
            .await
            .unwrap();
        assert_eq!(out, json!(5));
        assert_eq!(task.path(), "app.tasks.add");
        assert_eq!(task.label(), "Math adder");
    }

    #[tokio::test]
    async fn binding_error_is_argument_error() {
        let err = add_task()
            .call(Arguments::from_parts(vec![json!(2)], Default::default()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, "ArgumentError");
    }

    #[tokio::test]
    async fn closures_are_handlers() {
        let handler = |t: Add| async move { Ok::<_, TaskFailure>(t.a * t.b) };
        let task = TypedTask::<Add>::new(Arc::new(handler), TaskOptions::default());
        let out = task
            .call(Arguments::from_parts(vec![json!(4), json!(5)], Default::default()))
            .await
            .unwrap();
        assert_eq!(out, json!(20));
        assert_eq!(task.label(), "app.tasks.add");
    }
}
