//! courier-core
//!
//! Webhook-driven task dispatch. Tasks are published to an external delivery
//! service, which calls back a signed webhook; the webhook verifies, decodes,
//! resolves, executes and records the task.
//!
//! # モジュール構成
//! - **config**: Settings（起動時に 1 回だけ構築、以後読み取り専用）
//! - **domain**: ドメインモデル（ids, invocation, options, status, outcome, result, schedule, errors）
//! - **ports**: 抽象化レイヤー（ResultStore, ScheduleStore, DeliveryService, Clock, IdGenerator）
//! - **typed**: 型付き Task API（Task trait, Handler trait, TaskRegistry, TaskHandle）
//! - **app**: パイプライン本体（signature → decoder → resolver → executor → recorder）と dispatch
//! - **impls**: 実装（in-memory ストア、HTTP 配送クライアント）
//! - **server**: axum の Router

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod server;
pub mod typed;
