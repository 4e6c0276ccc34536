//! Mock backend for testing
//!
//! Provides configurable mock responses for both invocation modes.
//! Useful for unit tests and development without an API key.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use crate::error::{Error, Result};

use super::types::{AnalysisRequest, FragmentStream, ResponseFragment};
use super::AIBackend;

/// Default canned answer (valid for both plain and structured rendering)
pub const SAMPLE_STRUCTURED_ANSWER: &str = r#"{
  "decision": "APPROVED",
  "amount": 1500.0,
  "confidence": "HIGH",
  "justification": {
    "primary_reasoning": "The submitted claim falls within the policy's accidental damage cover.",
    "supporting_clauses": [
      {
        "clause_reference": "Section 4.2",
        "clause_text": "Accidental damage to insured property is covered up to the sum insured.",
        "application": "The reported damage was accidental and below the sum insured."
      }
    ],
    "key_factors": {
      "entity_analysis": {
        "extracted_entities": ["Policy holder", "Insured laptop"],
        "missing_information": []
      },
      "rule_application": "Accidental damage clause applied without exclusions.",
      "calculation_method": "Repair invoice total minus zero excess."
    }
  },
  "recommendations": ["Pay the claim in full."],
  "flags": []
}"#;

/// Mock AI backend for testing
///
/// Returns a fixed reply. Streaming splits the reply into fragments of
/// `chunk_chars` characters. Calls and the last request are recorded so tests
/// can assert on what the intake sent.
#[derive(Clone)]
pub struct MockBackend {
    reply: String,
    chunk_chars: usize,
    /// Fail every call with this message
    failure: Option<String>,
    /// Fail the stream after this many fragments
    stream_fail_after: Option<usize>,
    /// Wait this long before answering
    delay: Option<Duration>,
    /// Whether health_check should return true
    pub healthy: bool,
    calls: Arc<AtomicUsize>,
    pulled: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<AnalysisRequest>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend answering with the sample structured answer
    pub fn new() -> Self {
        Self::with_reply(SAMPLE_STRUCTURED_ANSWER)
    }

    /// Create a mock backend answering with `reply`
    pub fn with_reply(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            chunk_chars: 16,
            failure: None,
            stream_fail_after: None,
            delay: None,
            healthy: true,
            calls: Arc::new(AtomicUsize::new(0)),
            pulled: Arc::new(AtomicUsize::new(0)),
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a mock backend whose calls always fail
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            healthy: false,
            ..Self::with_reply("")
        }
    }

    /// Size of each streamed fragment, in characters
    pub fn chunk_chars(mut self, chunk_chars: usize) -> Self {
        self.chunk_chars = chunk_chars.max(1);
        self
    }

    /// Make the stream fail after delivering `fragments` fragments
    pub fn fail_stream_after(mut self, fragments: usize) -> Self {
        self.stream_fail_after = Some(fragments);
        self
    }

    /// Answer only after `delay` (for deadline tests)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of generate/generate_stream calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of stream items pulled by consumers so far
    pub fn pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }

    /// The last request received
    pub fn last_request(&self) -> Option<AnalysisRequest> {
        self.last_request.lock().ok().and_then(|r| r.clone())
    }

    /// The reply split the way the stream delivers it
    pub fn fragments(&self) -> Vec<String> {
        let chars: Vec<char> = self.reply.chars().collect();
        chars
            .chunks(self.chunk_chars)
            .map(|c| c.iter().collect())
            .collect()
    }

    async fn record(&self, request: &AnalysisRequest) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(message) => Err(Error::Backend(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn generate(&self, request: &AnalysisRequest) -> Result<String> {
        self.record(request).await?;
        Ok(self.reply.clone())
    }

    async fn generate_stream(&self, request: &AnalysisRequest) -> Result<FragmentStream> {
        self.record(request).await?;

        // Lead with an empty fragment: fragments may carry no text at all
        let mut items: Vec<Result<ResponseFragment>> = vec![Ok(ResponseFragment::default())];
        for (i, piece) in self.fragments().into_iter().enumerate() {
            if self.stream_fail_after == Some(i) {
                items.push(Err(Error::Backend("mock stream interrupted".into())));
                break;
            }
            items.push(Ok(ResponseFragment::new(vec![piece])));
        }

        let pulled = self.pulled.clone();
        Ok(futures::stream::iter(items)
            .inspect(move |_| {
                pulled.fetch_add(1, Ordering::SeqCst);
            })
            .boxed())
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
