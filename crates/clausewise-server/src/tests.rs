//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use clausewise_core::render::{PLAIN_CLOSE, PLAIN_OPEN};
use clausewise_core::{AIClient, MockBackend, SystemPromptSource};
use http_body_util::BodyExt;
use std::time::Duration;
use tower::ServiceExt;

const BOUNDARY: &str = "clausewise-test-boundary";

fn setup_app(mock: &MockBackend, mode: RenderMode, config: ServerConfig) -> Router {
    setup_app_with_prompt(mock, mode, config, SystemPromptSource::Inline("Test prompt".into()))
}

fn setup_app_with_prompt(
    mock: &MockBackend,
    mode: RenderMode,
    config: ServerConfig,
    prompt: SystemPromptSource,
) -> Router {
    let analyzer = Analyzer::new(AIClient::Mock(mock.clone()), Arc::new(prompt), mode);
    create_router(analyzer, None, config)
}

/// A multipart part: field name, optional filename, content
type Part<'a> = (&'a str, Option<&'a str>, &'a [u8]);

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, content) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/pdf\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
            }
        }
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn submit_request(parts: &[Part]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/submit")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn valid_parts<'a>() -> Vec<Part<'a>> {
    vec![
        ("query", None, b"Is water damage covered?".as_slice()),
        ("document_file", Some("policy.pdf"), b"%PDF-1.4 policy text".as_slice()),
    ]
}

async fn get_body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn content_type(response: &axum::response::Response) -> String {
    response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

// ========== Page and Health Tests ==========

#[tokio::test]
async fn test_home_page() {
    let app = setup_app(&MockBackend::new(), RenderMode::Plain, ServerConfig::default());

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(content_type(&response).starts_with("text/html"));
    let html = get_body_text(response).await;
    assert!(html.contains(r#"enctype="multipart/form-data""#));
    assert!(html.contains(r#"name="query""#));
    assert!(html.contains(r#"name="document_file""#));
}

#[tokio::test]
async fn test_health_reports_configuration() {
    let config = ServerConfig {
        stream: true,
        ..Default::default()
    };
    let app = setup_app(&MockBackend::new(), RenderMode::Plain, config);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&get_body_text(response).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["backend"], "mock");
    assert_eq!(json["model"], "mock");
    assert_eq!(json["render_mode"], "plain");
    assert_eq!(json["streaming"], true);
}

#[tokio::test]
async fn test_security_headers() {
    let app = setup_app(&MockBackend::new(), RenderMode::Plain, ServerConfig::default());

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers["content-security-policy"]
        .to_str()
        .unwrap()
        .contains("frame-ancestors 'none'"));
}

// ========== Submit Tests ==========

#[tokio::test]
async fn test_submit_plain() {
    let mock = MockBackend::with_reply("Covered under <Section 2>.");
    let app = setup_app(&mock, RenderMode::Plain, ServerConfig::default());

    let response = app.oneshot(submit_request(&valid_parts())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(content_type(&response).starts_with("text/html"));
    let html = get_body_text(response).await;
    assert_eq!(
        html,
        format!("{}Covered under &lt;Section 2&gt;.{}", PLAIN_OPEN, PLAIN_CLOSE)
    );

    assert_eq!(mock.calls(), 1);
    let request = mock.last_request().unwrap();
    assert_eq!(request.query, "Is water damage covered?");
    assert_eq!(request.document, b"%PDF-1.4 policy text");
    assert_eq!(request.system_prompt, "Test prompt");
}

#[tokio::test]
async fn test_submit_structured() {
    let mock = MockBackend::new();
    let app = setup_app(&mock, RenderMode::Structured, ServerConfig::default());

    let response = app.oneshot(submit_request(&valid_parts())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = get_body_text(response).await;
    assert!(html.contains(r#"<h3 class="decision approved">Decision: APPROVED</h3>"#));
    assert!(html.contains(r#"<p class="amount">Amount: $1500.00</p>"#));
    assert!(html.contains("clauses-section"));
    assert!(!html.contains("flags-section"));
}

#[tokio::test]
async fn test_submit_empty_query_rejected() {
    let mock = MockBackend::new();
    let app = setup_app(&mock, RenderMode::Plain, ServerConfig::default());

    let response = app
        .oneshot(submit_request(&[
            ("query", None, b"   ".as_slice()),
            ("document_file", Some("policy.pdf"), b"%PDF".as_slice()),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(content_type(&response).starts_with("text/plain"));
    assert_eq!(get_body_text(response).await, "Query is required");
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn test_submit_missing_query_wins_over_missing_document() {
    let mock = MockBackend::new();
    let app = setup_app(&mock, RenderMode::Plain, ServerConfig::default());

    let response = app.oneshot(submit_request(&[])).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(get_body_text(response).await, "Query is required");
}

#[tokio::test]
async fn test_submit_document_errors() {
    let mock = MockBackend::new();
    let cases: Vec<(Vec<Part>, &str)> = vec![
        (
            vec![("query", None, b"q".as_slice())],
            "Document file is required",
        ),
        (
            vec![
                ("query", None, b"q".as_slice()),
                ("document_file", Some("a.pdf"), b"one".as_slice()),
                ("document_file", Some("b.pdf"), b"two".as_slice()),
            ],
            "Only one document file may be uploaded",
        ),
        (
            vec![
                ("query", None, b"q".as_slice()),
                ("document_file", Some("empty.pdf"), b"".as_slice()),
            ],
            "Uploaded document is empty",
        ),
    ];

    for (parts, expected) in cases {
        let app = setup_app(&mock, RenderMode::Plain, ServerConfig::default());
        let response = app.oneshot(submit_request(&parts)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(get_body_text(response).await, expected);
    }
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn test_submit_not_multipart() {
    let app = setup_app(&MockBackend::new(), RenderMode::Plain, ServerConfig::default());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/submit")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"query":"q"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(get_body_text(response)
        .await
        .starts_with("Invalid form submission"));
}

#[tokio::test]
async fn test_submit_declared_length_over_limit() {
    let mock = MockBackend::new();
    let config = ServerConfig {
        max_upload_size: 1024 * 1024,
        ..Default::default()
    };
    let app = setup_app(&mock, RenderMode::Plain, config);

    let mut request = submit_request(&valid_parts());
    request
        .headers_mut()
        .insert("content-length", (2 * 1024 * 1024).to_string().parse().unwrap());

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(get_body_text(response).await.contains("Maximum size is 1 MB"));
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn test_submit_streamed_body_over_limit() {
    let mock = MockBackend::new();
    let config = ServerConfig {
        max_upload_size: 4096,
        ..Default::default()
    };
    let app = setup_app(&mock, RenderMode::Plain, config);

    let big = vec![b'x'; 16 * 1024];
    let response = app
        .oneshot(submit_request(&[
            ("query", None, b"q".as_slice()),
            ("document_file", Some("big.pdf"), big.as_slice()),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn test_submit_backend_failure_is_bad_gateway() {
    let mock = MockBackend::failing("quota exceeded");
    let app = setup_app(&mock, RenderMode::Plain, ServerConfig::default());

    let response = app.oneshot(submit_request(&valid_parts())).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(content_type(&response).starts_with("text/plain"));
    assert!(get_body_text(response).await.contains("quota exceeded"));
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_submit_empty_answer_is_bad_gateway() {
    let mock = MockBackend::with_reply("  ");
    let app = setup_app(&mock, RenderMode::Plain, ServerConfig::default());

    let response = app.oneshot(submit_request(&valid_parts())).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(get_body_text(response).await.contains("empty response"));
}

#[tokio::test]
async fn test_submit_invalid_structured_answer_is_bad_gateway() {
    let mock = MockBackend::with_reply("Approved, probably.");
    let app = setup_app(&mock, RenderMode::Structured, ServerConfig::default());

    let response = app.oneshot(submit_request(&valid_parts())).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = get_body_text(response).await;
    assert!(body.starts_with("Invalid response shape"));
    assert!(!body.contains("response-section"));
}

#[tokio::test]
async fn test_submit_missing_prompt_file_is_internal_error() {
    let mock = MockBackend::new();
    let app = setup_app_with_prompt(
        &mock,
        RenderMode::Plain,
        ServerConfig::default(),
        SystemPromptSource::file("/nonexistent/system_prompt.txt"),
    );

    let response = app.oneshot(submit_request(&valid_parts())).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(get_body_text(response).await.contains("system prompt"));
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn test_submit_prompt_file_reread() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("system_prompt.txt");
    std::fs::write(&path, "first prompt").unwrap();

    let mock = MockBackend::with_reply("ok");
    let app = setup_app_with_prompt(
        &mock,
        RenderMode::Plain,
        ServerConfig::default(),
        SystemPromptSource::file(&path),
    );

    let response = app.clone().oneshot(submit_request(&valid_parts())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(mock.last_request().unwrap().system_prompt, "first prompt");

    std::fs::write(&path, "second prompt").unwrap();
    let response = app.oneshot(submit_request(&valid_parts())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(mock.last_request().unwrap().system_prompt, "second prompt");
}

#[tokio::test]
async fn test_submit_timeout_is_gateway_timeout() {
    let mock = MockBackend::new().with_delay(Duration::from_secs(5));
    let config = ServerConfig {
        request_timeout: Duration::from_millis(50),
        ..Default::default()
    };
    let app = setup_app(&mock, RenderMode::Plain, config);

    let response = app.oneshot(submit_request(&valid_parts())).await.unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(get_body_text(response).await.contains("Timed out"));
}

#[tokio::test]
async fn test_stalled_upload_is_gateway_timeout() {
    let mock = MockBackend::new();
    let config = ServerConfig {
        request_timeout: Duration::from_millis(100),
        ..Default::default()
    };
    let app = setup_app(&mock, RenderMode::Plain, config);

    // The query part arrives, then the document part starts and never finishes
    let head = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"query\"\r\n\r\nIs it covered?\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"document_file\"; filename=\"policy.pdf\"\r\n\
         Content-Type: application/pdf\r\n\r\n%PDF-1.4 partial",
        b = BOUNDARY
    );
    let chunks = futures::StreamExt::chain(
        futures::stream::iter([Ok::<_, std::io::Error>(axum::body::Bytes::from(head))]),
        futures::stream::pending(),
    );
    let request = Request::builder()
        .method("POST")
        .uri("/submit")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from_stream(chunks))
        .unwrap();

    let response = tokio::time::timeout(Duration::from_secs(5), app.oneshot(request))
        .await
        .expect("handler should give up at the request deadline")
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(get_body_text(response).await.contains("Timed out"));
    assert_eq!(mock.calls(), 0);
}

// ========== Streaming Tests ==========

fn streaming_config() -> ServerConfig {
    ServerConfig {
        stream: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_streamed_body_matches_synchronous_body() {
    let reply = "The policy covers sudden & accidental water damage <see 2.1>.";
    let mock = MockBackend::with_reply(reply).chunk_chars(5);

    let sync_app = setup_app(&mock, RenderMode::Plain, ServerConfig::default());
    let sync_body = get_body_text(sync_app.oneshot(submit_request(&valid_parts())).await.unwrap()).await;

    let stream_app = setup_app(&mock, RenderMode::Plain, streaming_config());
    let response = stream_app.oneshot(submit_request(&valid_parts())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(content_type(&response).starts_with("text/html"));
    let streamed_body = get_body_text(response).await;

    assert_eq!(streamed_body, sync_body);
    assert_eq!(mock.calls(), 2);
}

#[tokio::test]
async fn test_stream_failure_reported_inline() {
    let mock = MockBackend::with_reply("partial answer text").chunk_chars(4).fail_stream_after(2);
    let app = setup_app(&mock, RenderMode::Plain, streaming_config());

    let response = app.oneshot(submit_request(&valid_parts())).await.unwrap();

    // Status is already committed when the stream breaks
    assert_eq!(response.status(), StatusCode::OK);
    let body = get_body_text(response).await;
    assert!(body.contains("<pre>partial </pre>"));
    assert!(body.contains(r#"<div class="stream-error">"#));
}

#[tokio::test]
async fn test_stream_validation_errors_keep_status() {
    let mock = MockBackend::new();
    let app = setup_app(&mock, RenderMode::Plain, streaming_config());

    let response = app
        .oneshot(submit_request(&[("query", None, b"q".as_slice())]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn test_stream_open_failure_is_bad_gateway() {
    let mock = MockBackend::failing("unavailable");
    let app = setup_app(&mock, RenderMode::Plain, streaming_config());

    let response = app.oneshot(submit_request(&valid_parts())).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_structured_mode_ignores_streaming() {
    let mock = MockBackend::new().chunk_chars(3);
    let app = setup_app(&mock, RenderMode::Structured, streaming_config());

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&get_body_text(response).await).unwrap();
    assert_eq!(json["streaming"], false);

    let response = app.oneshot(submit_request(&valid_parts())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = get_body_text(response).await;
    assert!(html.contains("Decision: APPROVED"));
    assert!(!html.contains("<pre>"));
}

// ========== Error Mapping Tests ==========

#[test]
fn test_core_error_status_mapping() {
    use clausewise_core::Error;

    let cases = [
        (Error::MissingQuery, StatusCode::BAD_REQUEST),
        (Error::DuplicateDocument, StatusCode::BAD_REQUEST),
        (Error::BadForm("x".into()), StatusCode::BAD_REQUEST),
        (Error::Backend("x".into()), StatusCode::BAD_GATEWAY),
        (Error::EmptyResponse, StatusCode::BAD_GATEWAY),
        (Error::InvalidShape("x".into()), StatusCode::BAD_GATEWAY),
        (
            Error::SystemPrompt {
                path: "p.txt".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            },
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];
    for (err, status) in cases {
        let message = err.to_string();
        let app_error = AppError::from(err);
        assert_eq!(app_error.status(), status);
        assert_eq!(app_error.message(), message);
    }
}
