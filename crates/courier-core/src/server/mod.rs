//! HTTP サーバー
//!
//! # エンドポイント
//!
//! - `POST <webhook_path>` - 配送サービスからのコールバック（デフォルト `/qstash/webhook/`）
//! - `GET /tasks/{task_id}` - 1 タスクの記録済みステータス
//! - `GET /health` - サーバーが動いていれば 200

use std::sync::Arc;

pub mod health;
pub mod status;
pub mod webhook;

pub use health::health_handler;
pub use status::status_handler;
pub use webhook::webhook_handler;

use crate::app::App;

/// Shared state handed to every handler through axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    app: Arc<App>,
}

impl AppState {
    pub fn new(app: Arc<App>) -> Self {
        Self { app }
    }

    pub fn app(&self) -> &App {
        &self.app
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    let webhook_route = app_state.app().settings().webhook_route();
    axum::Router::new()
        .route(&webhook_route, post(webhook_handler))
        .route("/tasks/{task_id}", get(status_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::app::AppBuilder;
    use crate::app::signature::sign;
    use crate::config::Settings;
    use crate::config::test_support::{CURRENT_KEY, NEXT_KEY, settings};
    use rstest::rstest;
    use crate::domain::TaskOptions;
    use crate::impls::RecordingDeliveryService;
    use crate::typed::task::fixtures::{
        Add, AddHandler, Boom, BoomHandler, Explode, ExplodeHandler,
    };

    const CALLBACK: &str = "https://example.com/qstash/webhook/";

    fn router() -> axum::Router {
        let app = AppBuilder::new(settings())
            .delivery(Arc::new(RecordingDeliveryService::new()))
            .register::<Add, _>(AddHandler, TaskOptions::default())
            .unwrap()
            .register::<Boom, _>(BoomHandler, TaskOptions::default())
            .unwrap()
            .register::<Explode, _>(ExplodeHandler, TaskOptions::default())
            .unwrap()
            .build()
            .unwrap();
        build_router(AppState::new(Arc::new(app)))
    }

    fn webhook_request(body: &Value, message_id: &str) -> Request<Body> {
        let bytes = serde_json::to_vec(body).unwrap();
        let signature = sign(CURRENT_KEY, &bytes, CALLBACK, Utc::now()).unwrap();
        Request::builder()
            .method("POST")
            .uri("/qstash/webhook/")
            .header("host", "example.com")
            .header("content-type", "application/json")
            .header("upstash-signature", signature)
            .header("upstash-message-id", message_id)
            .body(Body::from(bytes))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    async fn get(app: axum::Router, uri: &str) -> axum::response::Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn health_returns_200() {
        let response = get(router(), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn missing_signature_returns_400() {
        let request = Request::builder()
            .method("POST")
            .uri("/qstash/webhook/")
            .header("host", "example.com")
            .body(Body::from(r#"{"module":"app.tasks","function":"add"}"#))
            .unwrap();
        let response = router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("missing signature"));
    }

    fn signed_for(url: &str, host: &str) -> Request<Body> {
        let bytes = serde_json::to_vec(&json!({"module": "app.tasks", "function": "add", "args": [2, 3]})).unwrap();
        let signature = sign(CURRENT_KEY, &bytes, url, Utc::now()).unwrap();
        Request::builder()
            .method("POST")
            .uri("/qstash/webhook/")
            .header("host", host)
            .header("upstash-signature", signature)
            .header("upstash-message-id", "msg_host")
            .body(Body::from(bytes))
            .unwrap()
    }

    #[tokio::test]
    async fn signature_for_other_endpoint_is_rejected_even_with_matching_host() {
        let request = signed_for("https://other.example/qstash/webhook/", "other.example");
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"]
            .as_str()
            .unwrap()
            .contains("invalid signature"));
    }

    #[rstest]
    #[case("127.0.0.1:8000")]
    #[case("attacker.example")]
    #[tokio::test]
    async fn host_header_does_not_affect_verification(#[case] host: &str) {
        let response = router().oneshot(signed_for(CALLBACK, host)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "SUCCESS");
    }

    #[tokio::test]
    async fn forwarded_proto_is_used_when_https_is_not_forced() {
        let settings = Settings::builder()
            .token("qstash_token")
            .signing_keys(CURRENT_KEY, NEXT_KEY)
            .domain("example.com")
            .force_https(false)
            .build()
            .unwrap();
        let app = AppBuilder::new(settings)
            .delivery(Arc::new(RecordingDeliveryService::new()))
            .register::<Add, _>(AddHandler, TaskOptions::default())
            .unwrap()
            .build()
            .unwrap();
        let router = build_router(AppState::new(Arc::new(app)));

        let plain = router.clone().oneshot(signed_for(CALLBACK, "internal:8000")).await.unwrap();
        assert_eq!(plain.status(), StatusCode::BAD_REQUEST);

        let mut forwarded = signed_for(CALLBACK, "internal:8000");
        forwarded
            .headers_mut()
            .insert("x-forwarded-proto", "https".parse().unwrap());
        let response = router.oneshot(forwarded).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn add_succeeds_and_is_queryable() {
        let app = router();
        let body = json!({"module": "app.tasks", "function": "add", "args": [2, 3], "kwargs": {}});
        let response = app
            .clone()
            .oneshot(webhook_request(&body, "msg_1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"task_id": "msg_1", "status": "SUCCESS"})
        );

        let response = get(app, "/tasks/msg_1").await;
        assert_eq!(response.status(), StatusCode::OK);
        let row = json_body(response).await;
        assert_eq!(row["status"], "SUCCESS");
        assert_eq!(row["result"], 5);
        assert_eq!(row["function_path"], "app.tasks.add");
    }

    #[tokio::test]
    async fn raising_task_is_execution_error() {
        let app = router();
        let body = json!({"module": "app.tasks", "function": "boom"});
        let response = app
            .clone()
            .oneshot(webhook_request(&body, "msg_2"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "EXECUTION_ERROR");

        let row = json_body(get(app, "/tasks/msg_2").await).await;
        assert!(row["traceback"].as_str().unwrap().contains("ValueError"));
    }

    #[tokio::test]
    async fn panicking_task_is_other_error() {
        let body = json!({"module": "app.other", "function": "explode"});
        let response = router().oneshot(webhook_request(&body, "msg_3")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "OTHER_ERROR");
    }

    #[tokio::test]
    async fn duplicate_delivery_keeps_one_row() {
        let app = router();
        let body = json!({"module": "app.tasks", "function": "add", "args": [1, 2]});
        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(webhook_request(&body, "msg_dup"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        let row = json_body(get(app, "/tasks/msg_dup").await).await;
        assert_eq!(row["result"], 3);
    }

    #[tokio::test]
    async fn unknown_task_id_is_404_unknown() {
        let response = get(router(), "/tasks/nope").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["status"], "UNKNOWN");
    }
}
