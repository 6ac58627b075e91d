//! Typed - 型付き Task API
//!
//! task path の typo を型で排除し、Handler との対応付けを静的に保証します。
//!
//! # 二層構造
//! - **表層（Typed）**: `Task` trait, `Handler<T>` trait, `TaskHandle<T>`
//! - **内部（Dyn）**: `DynTask` trait - object-safe, type erasure

pub mod arguments;
pub mod handle;
pub mod handler;
pub mod registry;
pub mod task;

pub use self::arguments::{Arguments, BindError};
pub use self::handle::TaskHandle;
pub use self::handler::{DynTask, Handler, TypedTask};
pub use self::registry::{RegistryError, TaskRegistry};
pub use self::task::Task;
