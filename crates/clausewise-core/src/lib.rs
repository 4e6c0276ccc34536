//! Clausewise Core Library
//!
//! Shared functionality for the Clausewise document question-answering service:
//! - Pluggable AI backends (Google Gemini, mock) with synchronous and streaming calls
//! - Request intake: query + PDF validation and request building
//! - System prompt providers (embedded, inline, or re-read from disk)
//! - HTML rendering of plain and structured answers
//! - Layered settings (defaults, TOML, environment)

pub mod ai;
pub mod analysis;
pub mod config;
pub mod error;
pub mod intake;
pub mod models;
pub mod prompts;
pub mod render;

/// Test utilities including mock Gemini server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIBackend, AIClient, AnalysisRequest, FragmentStream, GeminiBackend, MockBackend,
    ResponseFragment, SAMPLE_STRUCTURED_ANSWER,
};
pub use analysis::Analyzer;
pub use config::{BackendKind, GeminiSettings, Settings};
pub use error::{Error, Result};
pub use intake::{Submission, DOCUMENT_FIELD, QUERY_FIELD};
pub use models::StructuredAnalysis;
pub use prompts::{SystemPromptProvider, SystemPromptSource, DEFAULT_SYSTEM_PROMPT};
pub use render::{escape_html, render, RenderMode};
