//! Task trait - 型付き Task の定義
//!
//! 1 つの Task 型 = 1 つの登録可能な関数。引数は構造体のフィールドとして表し、
//! `PARAMS` が位置引数の順序を決めます。
//!
//! # 使用例
//! ```ignore
//! #[derive(Serialize, Deserialize)]
//! struct Add { a: i64, b: i64 }
//!
//! impl Task for Add {
//!     const MODULE: &'static str = "app.tasks";
//!     const FUNCTION: &'static str = "add";
//!     const PARAMS: &'static [&'static str] = &["a", "b"];
//!     type Output = i64;
//! }
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::join_path;

/// Trait Bounds
/// - `Serialize`: dispatch 時に args/kwargs へ分解するため
/// - `DeserializeOwned`: webhook 受信時に args/kwargs から復元するため
/// - `Send + Sync + 'static`: `Arc<dyn ...>` に格納するため
pub trait Task: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Module part of the dotted path (`app.tasks`).
    const MODULE: &'static str;

    /// Function part of the dotted path (`add`).
    const FUNCTION: &'static str;

    /// Field names in positional order.
    const PARAMS: &'static [&'static str];

    type Output: Serialize + Send + 'static;

    fn path() -> String {
        join_path(Self::MODULE, Self::FUNCTION)
    }
}
