//! Pluggable AI backend abstraction
//!
//! This module provides a backend-agnostic interface for document question
//! answering. The production backend is Google Gemini; a mock backend serves
//! tests and local development.
//!
//! # Architecture
//!
//! - `AIBackend` trait: defines the interface for all AI operations
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `GeminiBackend`, `MockBackend`
//!
//! # Usage
//!
//! ```rust,ignore
//! let settings = Settings::load(None)?;
//! let ai = AIClient::from_settings(&settings).expect("backend configured");
//!
//! let request = AnalysisRequest::new(prompt, query, pdf_bytes);
//! let answer = ai.generate(&request).await?;
//! ```
//!
//! # Configuration
//!
//! - `AI_BACKEND`: Backend to use (gemini, mock). Default: gemini
//! - `GEMINI_API_KEY` / `GOOGLE_API_KEY`: API key for the gemini backend

pub mod gemini;
mod mock;
pub mod sse;
pub mod types;

pub use gemini::GeminiBackend;
pub use mock::{MockBackend, SAMPLE_STRUCTURED_ANSWER};
pub use types::*;

use async_trait::async_trait;

use crate::config::{BackendKind, Settings};
use crate::error::Result;

/// Trait defining the interface for all AI backends
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Send one request and return the complete answer text
    async fn generate(&self, request: &AnalysisRequest) -> Result<String>;

    /// Send one request and return the answer as a stream of fragments
    ///
    /// Concatenating every fragment's text yields the same answer `generate`
    /// would have returned. A delivery error ends the stream.
    async fn generate_stream(&self, request: &AnalysisRequest) -> Result<FragmentStream>;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// Google Gemini (REST API)
    Gemini(GeminiBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from resolved settings
    ///
    /// Returns None when the gemini backend is selected but no API key is set.
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        match settings.backend {
            BackendKind::Gemini => GeminiBackend::from_settings(&settings.gemini).map(AIClient::Gemini),
            BackendKind::Mock => Some(AIClient::Mock(MockBackend::new())),
        }
    }

    /// Short backend name (for logging and `/health`)
    pub fn kind(&self) -> &'static str {
        match self {
            AIClient::Gemini(_) => "gemini",
            AIClient::Mock(_) => "mock",
        }
    }

    /// Ask the backend for raw JSON answers (structured mode)
    pub fn with_json_output(&self, json_output: bool) -> Self {
        match self {
            AIClient::Gemini(b) => AIClient::Gemini(b.with_json_output(json_output)),
            AIClient::Mock(b) => AIClient::Mock(b.clone()),
        }
    }
}

// Implement AIBackend for AIClient by delegating to the inner backend
#[async_trait]
impl AIBackend for AIClient {
    async fn generate(&self, request: &AnalysisRequest) -> Result<String> {
        match self {
            AIClient::Gemini(b) => b.generate(request).await,
            AIClient::Mock(b) => b.generate(request).await,
        }
    }

    async fn generate_stream(&self, request: &AnalysisRequest) -> Result<FragmentStream> {
        match self {
            AIClient::Gemini(b) => b.generate_stream(request).await,
            AIClient::Mock(b) => b.generate_stream(request).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::Gemini(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::Gemini(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::Gemini(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}
