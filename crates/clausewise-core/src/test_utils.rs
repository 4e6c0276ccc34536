//! Test utilities for clausewise-core
//!
//! This module provides testing infrastructure including a mock Gemini server
//! that speaks enough of the REST and SSE protocol for backend tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tokio::sync::oneshot;

use crate::ai::gemini::{
    ApiErrorDetail, Candidate, Content, GenerateContentRequest, GenerateContentResponse, Part,
};

/// What the mock server saw in the last generate call
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub model: String,
    pub api_key: Option<String>,
    pub system_text: Option<String>,
    pub query_text: Option<String>,
    pub document_base64: Option<String>,
    pub json_output: bool,
}

#[derive(Clone)]
struct MockState {
    answer: String,
    failure: Option<(u16, String)>,
    last_request: Arc<Mutex<Option<SeenRequest>>>,
}

/// Mock Gemini server for testing
pub struct MockGeminiServer {
    addr: SocketAddr,
    last_request: Arc<Mutex<Option<SeenRequest>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockGeminiServer {
    /// Start a server that answers every request with `answer`
    pub async fn start(answer: &str) -> Self {
        Self::start_with(answer.to_string(), None).await
    }

    /// Start a server that fails every request with the given status and message
    pub async fn start_failing(status: u16, message: &str) -> Self {
        Self::start_with(String::new(), Some((status, message.to_string()))).await
    }

    async fn start_with(answer: String, failure: Option<(u16, String)>) -> Self {
        let last_request = Arc::new(Mutex::new(None));
        let state = MockState {
            answer,
            failure,
            last_request: last_request.clone(),
        };

        let app = Router::new()
            .route("/:version/models/:call", post(handle_call).get(handle_model))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            last_request,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// The most recent generate request, if any
    pub fn last_request(&self) -> Option<SeenRequest> {
        self.last_request.lock().ok().and_then(|r| r.clone())
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockGeminiServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Deserialize)]
struct CallQuery {
    alt: Option<String>,
}

/// Build one response body carrying the given text pieces
fn answer_chunk(texts: Vec<String>) -> GenerateContentResponse {
    GenerateContentResponse {
        candidates: vec![Candidate {
            content: Some(Content {
                role: Some("model".to_string()),
                parts: texts
                    .into_iter()
                    .map(|t| Part {
                        text: Some(t),
                        ..Default::default()
                    })
                    .collect(),
            }),
            finish_reason: None,
        }],
        ..Default::default()
    }
}

/// Split an answer into roughly three word-aligned pieces
fn split_answer(answer: &str) -> Vec<String> {
    let words: Vec<&str> = answer.split_inclusive(' ').collect();
    let size = words.len().div_ceil(3).max(1);
    words.chunks(size).map(|c| c.concat()).collect()
}

/// `POST /{version}/models/{model}:{method}`
async fn handle_call(
    State(state): State<MockState>,
    Path((_version, call)): Path<(String, String)>,
    Query(query): Query<CallQuery>,
    headers: HeaderMap,
    Json(request): Json<GenerateContentRequest>,
) -> Response {
    let (model, method) = call.split_once(':').unwrap_or((call.as_str(), ""));

    let parts = request
        .contents
        .first()
        .map(|c| c.parts.as_slice())
        .unwrap_or_default();
    let seen = SeenRequest {
        model: model.to_string(),
        api_key: headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        system_text: parts.first().and_then(|p| p.text.clone()),
        query_text: parts.get(1).and_then(|p| p.text.clone()),
        document_base64: parts
            .get(2)
            .and_then(|p| p.inline_data.as_ref())
            .map(|b| b.data.clone()),
        json_output: request
            .generation_config
            .as_ref()
            .and_then(|g| g.response_mime_type.as_deref())
            == Some("application/json"),
    };
    if let Ok(mut last) = state.last_request.lock() {
        *last = Some(seen);
    }

    if let Some((status, message)) = &state.failure {
        let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::json!({
            "error": ApiErrorDetail {
                code: Some(status.as_u16()),
                message: message.clone(),
                status: Some("PERMISSION_DENIED".to_string()),
            }
        });
        return (status, Json(body)).into_response();
    }

    match method {
        "generateContent" => Json(answer_chunk(vec![state.answer.clone()])).into_response(),
        "streamGenerateContent" if query.alt.as_deref() == Some("sse") => {
            let mut body = String::new();
            for piece in split_answer(&state.answer) {
                let event = serde_json::to_string(&answer_chunk(vec![piece])).unwrap();
                body.push_str("data: ");
                body.push_str(&event);
                body.push_str("\r\n\r\n");
            }
            ([("content-type", "text/event-stream")], body).into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

/// `GET /{version}/models/{model}` (used by health checks)
async fn handle_model(Path((_version, model)): Path<(String, String)>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": format!("models/{}", model),
        "displayName": model,
    }))
}
