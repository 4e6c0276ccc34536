//! Request intake
//!
//! Collects the fields of one form submission and turns them into exactly one
//! [`AnalysisRequest`]. Checks run in a fixed order (query, then document, then
//! system prompt), so an empty query is reported even when the document is
//! also missing.

use tracing::debug;

use crate::ai::AnalysisRequest;
use crate::error::{Error, Result};
use crate::prompts::SystemPromptProvider;

/// Form field carrying the question
pub const QUERY_FIELD: &str = "query";

/// Form field carrying the PDF
pub const DOCUMENT_FIELD: &str = "document_file";

/// The fields of one submitted form
#[derive(Debug, Clone, Default)]
pub struct Submission {
    query: Option<String>,
    document: Option<Vec<u8>>,
    duplicate_document: bool,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a submission from already extracted values
    pub fn from_parts(query: impl Into<String>, document: Vec<u8>) -> Self {
        let mut submission = Self::new();
        submission.set_query(query.into());
        submission.push_document(document);
        submission
    }

    /// Record the query field (the first occurrence wins)
    pub fn set_query(&mut self, query: String) {
        if self.query.is_none() {
            self.query = Some(query);
        }
    }

    /// Record a document part
    ///
    /// Only one document is allowed; a second part marks the submission as
    /// invalid, reported when the request is built.
    pub fn push_document(&mut self, bytes: Vec<u8>) {
        if self.document.is_some() {
            self.duplicate_document = true;
        } else {
            self.document = Some(bytes);
        }
    }

    /// Check query and document without loading the system prompt
    pub fn validate(&self) -> Result<()> {
        self.checked().map(|_| ())
    }

    fn checked(&self) -> Result<(&str, &[u8])> {
        let query = self
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or(Error::MissingQuery)?;

        if self.duplicate_document {
            return Err(Error::DuplicateDocument);
        }
        let document = self.document.as_deref().ok_or(Error::MissingDocument)?;
        if document.is_empty() {
            return Err(Error::EmptyDocument);
        }

        Ok((query, document))
    }

    /// Validate and build the outbound request, loading the system prompt last
    pub async fn build_request(
        self,
        prompts: &dyn SystemPromptProvider,
    ) -> Result<AnalysisRequest> {
        let (query, document) = self.checked()?;
        let (query, document) = (query.to_string(), document.to_vec());

        let system_prompt = prompts.load_system_prompt().await?;

        debug!(
            query_len = query.len(),
            document_bytes = document.len(),
            prompt_len = system_prompt.len(),
            "Built analysis request"
        );

        Ok(AnalysisRequest::new(system_prompt, query, document))
    }
}
