//! AI backend request and response types
//!
//! These types are backend-agnostic and used across all AI implementations.

use futures::stream::BoxStream;

use crate::error::Result;

/// MIME type sent with every uploaded document
pub const DOCUMENT_MIME_TYPE: &str = "application/pdf";

/// A single outbound request to the AI backend
///
/// Built once per submission by the intake and owned by that invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// Instruction text for the model
    pub system_prompt: String,
    /// The user's question
    pub query: String,
    /// Raw document bytes
    pub document: Vec<u8>,
    /// MIME type of the document (always `application/pdf`)
    pub mime_type: String,
}

impl AnalysisRequest {
    pub fn new(system_prompt: String, query: String, document: Vec<u8>) -> Self {
        Self {
            system_prompt,
            query,
            document,
            mime_type: DOCUMENT_MIME_TYPE.to_string(),
        }
    }
}

/// One incremental piece of a streamed answer
///
/// A fragment may carry zero or more text pieces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseFragment {
    pub texts: Vec<String>,
}

impl ResponseFragment {
    pub fn new(texts: Vec<String>) -> Self {
        Self { texts }
    }

    /// Concatenated text of all pieces
    pub fn text(&self) -> String {
        self.texts.concat()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.iter().all(|t| t.is_empty())
    }
}

/// Lazy, finite, non-restartable sequence of answer fragments
pub type FragmentStream = BoxStream<'static, Result<ResponseFragment>>;
