//! Resolver - ドット区切りのパス → 登録済みタスク
//!
//! 解決はレジストリの参照のみ。登録されていない関数は webhook から呼べない。

use std::sync::Arc;

use crate::domain::{TaskError, join_path};
use crate::typed::{DynTask, TaskRegistry};

pub struct Resolver {
    registry: Arc<TaskRegistry>,
}

impl Resolver {
    pub fn new(registry: Arc<TaskRegistry>) -> Self {
        Self { registry }
    }

    pub fn resolve(&self, module: &str, function: &str) -> Result<Arc<dyn DynTask>, TaskError> {
        if !self.registry.has_module(module) {
            return Err(TaskError::ModuleNotFound(module.to_string()));
        }
        self.registry
            .get(&join_path(module, function))
            .ok_or_else(|| TaskError::FunctionNotFound {
                module: module.to_string(),
                function: function.to_string(),
            })
    }
}
