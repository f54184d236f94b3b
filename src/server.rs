//! HTTP entry point: the LINE webhook and a health check.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use tracing::{debug, warn};

use crate::bot::line::{WebhookBody, WebhookEvent};
use crate::bot::Dispatcher;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

/// POST /callback
///
/// Handles the first event of the batch and answers 200 once the body
/// parses. The user-visible outcome travels through the LINE reply, not
/// this response.
async fn callback(State(state): State<AppState>, body: String) -> impl IntoResponse {
    let webhook: WebhookBody = match serde_json::from_str(&body) {
        Ok(webhook) => webhook,
        Err(e) => {
            warn!("Failed to parse webhook body: {e}");
            return (StatusCode::BAD_REQUEST, "Invalid webhook body");
        }
    };

    let Some(event) = webhook.events.into_iter().next() else {
        debug!("Webhook without events (verification request)");
        return (StatusCode::OK, "Success!");
    };

    match WebhookEvent::into_inbound(event) {
        Some(inbound) => {
            state.dispatcher.handle_event(inbound, chrono::Utc::now()).await;
        }
        None => debug!("Event without reply token, ignoring"),
    }

    (StatusCode::OK, "Success!")
}

/// GET /health
async fn health() -> &'static str {
    "ok"
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/callback", post(callback))
        .route("/health", get(health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::database::{SqliteStore, UsageStore};
    use crate::bot::fakes::{FakeCompletion, RecordingSender};
    use crate::bot::UsageGuard;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        store: Arc<SqliteStore>,
        sender: Arc<RecordingSender>,
    }

    fn app() -> TestApp {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let sender = Arc::new(RecordingSender::default());
        let dispatcher = Dispatcher::new(
            store.clone(),
            Arc::new(FakeCompletion::default()),
            sender.clone(),
            UsageGuard::default(),
            6,
        );
        let router = router(AppState { dispatcher: Arc::new(dispatcher) });
        TestApp { router, store, sender }
    }

    async fn post_callback(router: Router, body: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("POST")
            .uri("/callback")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app().router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_text_message_is_dispatched_and_replied() {
        let app = app();
        let body = r#"{"events":[{
            "type":"message","replyToken":"rt-1",
            "source":{"type":"user","userId":"U42"},
            "message":{"id":"1","type":"text","text":"【モード:英文添削】"}
        }]}"#;

        let (status, text) = post_callback(app.router, body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "Success!");

        let sent = app.sender.last();
        assert_eq!(sent.reply_token, "rt-1");
        assert_eq!(sent.quick_replies.len(), 1);
        assert_eq!(app.store.get_user("U42").unwrap().unwrap().mode_code, 2);
    }

    #[tokio::test]
    async fn test_image_message_gets_error_reply() {
        let app = app();
        let body = r#"{"events":[{
            "type":"message","replyToken":"rt-2",
            "source":{"type":"user","userId":"U42"},
            "message":{"id":"2","type":"image"}
        }]}"#;

        let (status, _) = post_callback(app.router, body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.sender.last().text, "Error: Message is not a text type.");
        assert!(app.store.get_user("U42").unwrap().is_none());
        assert_eq!(app.store.recent_log("U42", 1).unwrap()[0].user_message, "[image]");
    }

    #[tokio::test]
    async fn test_verification_request_sends_nothing() {
        let app = app();
        let (status, _) = post_callback(app.router, r#"{"destination":"U0","events":[]}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.sender.count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let app = app();
        let (status, _) = post_callback(app.router, "not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
