//! Clausewise Web Server
//!
//! Axum-based form server: a query and a PDF go in, an HTML fragment comes out.
//!
//! Security features:
//! - Restrictive CORS policy (same-origin unless origins are configured)
//! - Upload size limits enforced before and while reading the body
//! - Security headers (nosniff, frame denial, CSP)
//! - Plain-text error responses without stack traces

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{debug, error, info, warn};

use clausewise_core::ai::AIBackend;
use clausewise_core::config::{DEFAULT_MAX_UPLOAD_MB, DEFAULT_REQUEST_TIMEOUT_SECS};
use clausewise_core::{Analyzer, RenderMode, Settings};

mod handlers;

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// Largest accepted request body in bytes
    pub max_upload_size: usize,
    /// Deadline for one submission, backend call included
    pub request_timeout: Duration,
    /// Forward partial answers as they arrive (plain mode only)
    pub stream: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![],
            max_upload_size: DEFAULT_MAX_UPLOAD_MB as usize * 1024 * 1024,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            stream: false,
        }
    }
}

impl ServerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            allowed_origins: settings.allowed_origins.clone(),
            max_upload_size: settings.max_upload_size(),
            request_timeout: settings.request_timeout(),
            stream: settings.streams(),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub analyzer: Analyzer,
    pub config: ServerConfig,
}

impl AppState {
    /// Whether `/submit` streams its answer
    pub fn streaming(&self) -> bool {
        self.config.stream && self.analyzer.mode() == RenderMode::Plain
    }
}

/// Reject bodies whose declared length is already over the limit
async fn content_length_guard(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    if let Some(length) = declared {
        if length > state.config.max_upload_size as u64 {
            return AppError::payload_too_large(&format!(
                "Upload too large. Maximum size is {} MB",
                state.config.max_upload_size / 1024 / 1024
            ))
            .into_response();
        }
    }

    next.run(request).await
}

/// Create the application router
pub fn create_router(analyzer: Analyzer, static_dir: Option<&str>, config: ServerConfig) -> Router {
    let state = Arc::new(AppState {
        analyzer,
        config: config.clone(),
    });

    let submit_routes = Router::new()
        .route("/submit", post(handlers::submit))
        .layer(DefaultBodyLimit::max(config.max_upload_size))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            content_length_guard,
        ));

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    // CSP: the form page needs no scripts, inline styles only
    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' data:; form-action 'self'; frame-ancestors 'none'",
    );

    let mut app = Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health))
        .merge(submit_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    // Serve static files if directory provided
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Start the server
pub async fn serve(
    settings: &Settings,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
) -> anyhow::Result<()> {
    let analyzer = Analyzer::from_settings(settings).ok_or_else(|| {
        anyhow::anyhow!(
            "Gemini backend not configured: set GEMINI_API_KEY (or AI_BACKEND=mock for local testing)"
        )
    })?;
    serve_with_analyzer(analyzer, host, port, static_dir, ServerConfig::from_settings(settings))
        .await
}

/// Start the server with a prepared analyzer
pub async fn serve_with_analyzer(
    analyzer: Analyzer,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if config.stream && analyzer.mode() == RenderMode::Structured {
        warn!("⚠️  Streaming ignored: structured rendering needs the complete answer");
    }

    check_ai_connection(&analyzer).await;

    info!(
        "Render mode: {} (streaming: {}, upload limit: {} MB, timeout: {}s)",
        analyzer.mode(),
        config.stream && analyzer.mode() == RenderMode::Plain,
        config.max_upload_size / 1024 / 1024,
        config.request_timeout.as_secs()
    );

    let app = create_router(analyzer, static_dir, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log AI backend connection status
async fn check_ai_connection(analyzer: &Analyzer) {
    let client = analyzer.ai();
    if client.health_check().await {
        info!(
            "✅ AI backend connected: {} {} (model: {})",
            client.kind(),
            client.host(),
            client.model()
        );
    } else {
        warn!(
            "⚠️  AI backend configured but not responding: {} (model: {})",
            client.host(),
            client.model()
        );
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
///
/// Rendered as a `text/plain` body.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    fn new(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn payload_too_large(msg: &str) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, msg)
    }

    pub fn internal(msg: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn bad_gateway(msg: &str) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, msg)
    }

    pub fn gateway_timeout(msg: &str) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, msg)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = &self.internal {
            error!(status = %self.status, error = %format!("{:#}", err), "Request failed");
        } else if self.status == StatusCode::GATEWAY_TIMEOUT {
            warn!(status = %self.status, message = %self.message, "Request timed out");
        } else if self.status.is_server_error() {
            error!(status = %self.status, message = %self.message, "Request failed");
        } else {
            debug!(status = %self.status, message = %self.message, "Request rejected");
        }

        (
            self.status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.message,
        )
            .into_response()
    }
}

impl From<clausewise_core::Error> for AppError {
    fn from(err: clausewise_core::Error) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else if err.is_backend_error() {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let message = err.to_string();
        let internal = status.is_server_error().then(|| anyhow::Error::new(err));
        Self {
            status,
            message,
            internal,
        }
    }
}

#[cfg(test)]
mod tests;
