#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use assistant_client::ChatApiClient;
use axum::{Json, Router};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header::AUTHORIZATION};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};
use url::Url;

#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: StatusCode,
    pub body: Value,
    pub delay: Duration,
}

impl MockReply {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
            delay: Duration::ZERO,
        }
    }

    pub fn error(status: StatusCode, detail: &str) -> Self {
        Self {
            status,
            body: json!({ "detail": detail }),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Debug, Clone, Default)]
struct MockPortalState {
    replies: Arc<Mutex<HashMap<String, VecDeque<MockReply>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub struct MockPortal {
    pub base_url: Url,
    state: MockPortalState,
    shutdown_tx: oneshot::Sender<()>,
    server_task: tokio::task::JoinHandle<()>,
}

impl MockPortal {
    // Routes are keyed as "METHOD /path"; paths include the /api prefix.
    pub async fn start(routes: Vec<(&str, MockReply)>) -> Self {
        let mut replies = HashMap::<String, VecDeque<MockReply>>::new();
        for (route, reply) in routes {
            replies.entry(route.to_string()).or_default().push_back(reply);
        }
        let state = MockPortalState {
            replies: Arc::new(Mutex::new(replies)),
            requests: Arc::new(Mutex::new(Vec::new())),
        };

        let app = Router::new()
            .fallback(record_and_reply)
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let local_addr = listener
            .local_addr()
            .expect("listener address should resolve");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let server_task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });

            server.await.expect("test server should run");
        });

        Self {
            base_url: Url::parse(&format!("http://{local_addr}/api"))
                .expect("mock base url should parse"),
            state,
            shutdown_tx,
            server_task,
        }
    }

    pub fn client(&self) -> ChatApiClient {
        ChatApiClient::new(self.base_url.clone(), reqwest::Client::new())
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().await.clone()
    }

    pub async fn shutdown(self) -> Vec<RecordedRequest> {
        let requests = self.requests().await;
        self.shutdown_tx
            .send(())
            .expect("shutdown signal should send");
        self.server_task.await.expect("server task should join");
        requests
    }
}

async fn record_and_reply(
    State(state): State<MockPortalState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let path = uri.path().to_string();
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .map(ToString::to_string);
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };

    state.requests.lock().await.push(RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        query: uri.query().map(ToString::to_string),
        authorization,
        body,
    });

    let key = format!("{method} {path}");
    let reply = state
        .replies
        .lock()
        .await
        .get_mut(&key)
        .and_then(VecDeque::pop_front)
        .unwrap_or_else(|| MockReply::error(StatusCode::NOT_FOUND, "Not Found"));

    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    (reply.status, Json(reply.body))
}

pub fn guest_chat_reply(response: &str, log_id: Option<&str>) -> MockReply {
    MockReply::ok(json!({
        "response": response,
        "topic": "schedule",
        "log_id": log_id,
    }))
}

pub fn settings_reply(name: &str, greeting: Option<&str>) -> MockReply {
    MockReply::ok(json!({
        "chatbot_name": name,
        "greeting_message_en": greeting,
        "greeting_message_ar": null,
        "suggested_questions_en": null,
        "suggested_questions_ar": null,
    }))
}
