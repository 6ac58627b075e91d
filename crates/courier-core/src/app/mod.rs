//! App - アプリケーション層
//!
//! ports を組み合わせて webhook 受信と dispatch を実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: 構築とワイヤリング
//! - **WebhookOrchestrator**: verify → decode → resolve → execute → record
//! - **DispatchClient**: タスク呼び出しを配送サービスへ publish
//! - **ScheduleManager**: 定期実行ルールの同期
//! - **ResultSweeper**: 保持期間切れの結果削除

pub mod builder;
pub mod decoder;
pub mod dispatch;
pub mod executor;
pub mod recorder;
pub mod resolver;
pub mod schedules;
pub mod signature;
pub mod sweeper;
pub mod webhook;

pub use self::builder::{App, AppBuilder, BuildError};
pub use self::dispatch::{AsyncHandle, DispatchClient};
pub use self::recorder::{Recorder, classify};
pub use self::resolver::Resolver;
pub use self::schedules::ScheduleManager;
pub use self::signature::{SIGNATURE_HEADER, SignatureVerifier};
pub use self::sweeper::ResultSweeper;
pub use self::webhook::{WebhookOrchestrator, WebhookRequest, WebhookResponse};
