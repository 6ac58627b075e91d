//! TaskRegistry - 登録済みタスクの許可リスト
//!
//! webhook の payload は署名で保護されていても外部から観測可能です。
//! ここに明示的に登録された関数だけが実行対象になります（fail closed）。
//!
//! # 内部実装
//! - `register::<T, H>(handler, options)` で登録し、`TaskHandle<T>` を返す
//! - 内部的に `TypedTask<T>` でラップして `DynTask` に型消去
//! - `HashMap<String, Arc<dyn DynTask>>`（key は dotted path）
//! - 起動時に構築し、実行時は `Arc<TaskRegistry>` として読み取り専用

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use super::handle::TaskHandle;
use super::handler::{DynTask, Handler, TypedTask};
use super::task::Task;
use crate::domain::TaskOptions;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Task '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("invalid task path '{0}': module and function must be non-empty and the function must not contain '.'")]
    InvalidPath(String),
}

#[derive(Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, Arc<dyn DynTask>>,
    modules: BTreeSet<String>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` as the implementation of `T`.
    pub fn register<T: Task, H: Handler<T> + 'static>(
        &mut self,
        handler: H,
        options: TaskOptions,
    ) -> Result<TaskHandle<T>, RegistryError> {
        let path = T::path();
        if T::MODULE.is_empty() || T::FUNCTION.is_empty() || T::FUNCTION.contains('.') {
            return Err(RegistryError::InvalidPath(path));
        }
        if self.tasks.contains_key(&path) {
            return Err(RegistryError::AlreadyRegistered(path));
        }

        let handler: Arc<dyn Handler<T>> = Arc::new(handler);
        let typed = TypedTask::<T>::new(Arc::clone(&handler), options.clone());
        self.tasks.insert(path, Arc::new(typed));
        self.modules.insert(T::MODULE.to_string());
        Ok(TaskHandle::new(handler, options))
    }

    pub fn get(&self, path: &str) -> Option<Arc<dyn DynTask>> {
        self.tasks.get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.tasks.contains_key(path)
    }

    /// Whether any task lives under `module`.
    pub fn has_module(&self, module: &str) -> bool {
        self.modules.contains(module)
    }

    /// Dotted paths, sorted.
    pub fn registered_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.tasks.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// `(path, label)` for every registered task, sorted by path.
    pub fn discover(&self) -> Vec<(String, String)> {
        let mut found: Vec<(String, String)> = self
            .tasks
            .iter()
            .map(|(path, task)| (path.clone(), task.label().to_string()))
            .collect();
        found.sort();
        found
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
