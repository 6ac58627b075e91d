//! Webhook ハンドラ - HTTP リクエストを `WebhookRequest` に変換して orchestrator に渡す
//!
//! # 設計原則
//! - 署名照合用 URL の host と path は設定値から組み立てる
//! - リクエストから採用するのは scheme（`X-Forwarded-Proto`）だけ
//! - `Host` / `X-Forwarded-Host` は参照しない

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use super::AppState;
use crate::app::{SIGNATURE_HEADER, WebhookRequest};

/// Delivery-service message id.
const HEADER_MESSAGE_ID: &str = "upstash-message-id";
const HEADER_FORWARDED_PROTO: &str = "x-forwarded-proto";

pub async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let app = state.app();
    let scheme = match header(&headers, HEADER_FORWARDED_PROTO) {
        Some(proto) if proto.eq_ignore_ascii_case("https") => "https",
        _ => "http",
    };

    let request = WebhookRequest {
        body: body.to_vec(),
        signature: header(&headers, SIGNATURE_HEADER).map(str::to_string),
        url: app.settings().webhook_url(scheme),
        message_id: header(&headers, HEADER_MESSAGE_ID).map(str::to_string),
    };

    let response = app.webhook().handle(request).await;
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.body)).into_response()
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
