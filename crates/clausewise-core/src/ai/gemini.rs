//! Google Gemini backend
//!
//! Talks to the Gemini REST API directly with reqwest:
//!
//! - `POST {host}/{version}/models/{model}:generateContent` for full answers
//! - `POST {host}/{version}/models/{model}:streamGenerateContent?alt=sse` for
//!   incremental answers delivered as server-sent events
//!
//! Every request carries one user turn with three parts: the system prompt,
//! the user query, and the document as inline base64 data.
//!
//! # Configuration
//!
//! Environment variables:
//! - `GEMINI_API_KEY` (or `GOOGLE_API_KEY`): API key (required)
//! - `GEMINI_HOST`, `GEMINI_API_VERSION`, `GEMINI_MODEL`: see `GeminiSettings`

use std::collections::VecDeque;

use async_trait::async_trait;
use base64::Engine;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GeminiSettings;
use crate::error::{Error, Result};

use super::sse::SseDecoder;
use super::types::{AnalysisRequest, FragmentStream, ResponseFragment};
use super::AIBackend;

/// Default Gemini API host
pub const DEFAULT_GEMINI_HOST: &str = "https://generativelanguage.googleapis.com";

/// Default API version (matches the stable SDK surface)
pub const DEFAULT_GEMINI_API_VERSION: &str = "v1";

/// Default model
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Header carrying the API key
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Request body for generateContent / streamGenerateContent
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// A conversation turn
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One part of a turn (text or inline binary data)
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
    /// Set on reasoning parts, which are not part of the answer
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub thought: bool,
}

impl Part {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            ..Default::default()
        }
    }

    fn inline(mime_type: &str, data: &[u8]) -> Self {
        Self {
            inline_data: Some(Blob {
                mime_type: mime_type.to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(data),
            }),
            ..Default::default()
        }
    }
}

/// Inline binary payload (base64 encoded)
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Blob {
    pub mime_type: String,
    pub data: String,
}

/// Generation configuration
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

/// Response body (also the payload of every SSE event)
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
    /// Present when an error is reported inside the event stream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorDetail>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptFeedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

/// Error envelope returned on non-2xx statuses
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ApiErrorDetail {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl GenerateContentResponse {
    /// Text pieces of the first candidate, reasoning parts skipped
    pub(crate) fn texts(&self) -> Vec<String> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|p| !p.thought)
                    .filter_map(|p| p.text.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Fail on a blocked prompt or an in-band error
    fn check(&self) -> Result<()> {
        if let Some(err) = &self.error {
            return Err(Error::Backend(format!(
                "Gemini API error ({}): {}",
                err.status.as_deref().unwrap_or("UNKNOWN"),
                err.message
            )));
        }
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Err(Error::Backend(format!("Prompt blocked by Gemini: {}", reason)));
        }
        Ok(())
    }
}

/// Gemini backend
#[derive(Clone)]
pub struct GeminiBackend {
    http_client: Client,
    base_url: String,
    api_version: String,
    model: String,
    api_key: String,
    json_output: bool,
}

impl GeminiBackend {
    /// Create a new Gemini backend using the default API version
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: DEFAULT_GEMINI_API_VERSION.to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            json_output: false,
        }
    }

    /// Create from settings, reading the API key from the environment
    ///
    /// Returns None if neither `GEMINI_API_KEY` nor `GOOGLE_API_KEY` is set.
    pub fn from_settings(settings: &GeminiSettings) -> Option<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty())?;
        Some(
            Self::new(&settings.host, api_key.trim(), &settings.model)
                .with_api_version(&settings.api_version),
        )
    }

    /// Use a different API version (e.g. `v1beta`)
    pub fn with_api_version(mut self, api_version: &str) -> Self {
        self.api_version = api_version.trim_matches('/').to_string();
        self
    }

    /// Ask the model for raw JSON output (`responseMimeType: application/json`)
    pub fn with_json_output(&self, json_output: bool) -> Self {
        Self {
            json_output,
            ..self.clone()
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn host(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/{}/models/{}:{}",
            self.base_url, self.api_version, self.model, method
        )
    }

    fn build_body(&self, request: &AnalysisRequest) -> GenerateContentRequest {
        let parts = vec![
            Part::text(format!("System: {}", request.system_prompt)),
            Part::text(format!("User Query: {}", request.query)),
            Part::inline(&request.mime_type, &request.document),
        ];

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: self.json_output.then(|| GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
            }),
        }
    }

    /// POST a request body and map non-2xx statuses to backend errors
    async fn post(
        &self,
        method: &str,
        query: &[(&str, &str)],
        body: &GenerateContentRequest,
    ) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .post(self.endpoint(method))
            .query(query)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or(text);
            return Err(Error::Backend(format!(
                "Gemini API error ({}): {}",
                status, message
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl AIBackend for GeminiBackend {
    async fn generate(&self, request: &AnalysisRequest) -> Result<String> {
        let body = self.build_body(request);

        debug!(
            model = %self.model,
            query_len = request.query.len(),
            document_bytes = request.document.len(),
            json_output = self.json_output,
            "Sending Gemini generateContent request"
        );

        let response: GenerateContentResponse =
            self.post("generateContent", &[], &body).await?.json().await?;
        response.check()?;

        let text = response.texts().concat();
        debug!(
            answer_len = text.len(),
            finish_reason = ?response.candidates.first().and_then(|c| c.finish_reason.as_deref()),
            "Received Gemini response"
        );

        Ok(text)
    }

    async fn generate_stream(&self, request: &AnalysisRequest) -> Result<FragmentStream> {
        let body = self.build_body(request);

        debug!(
            model = %self.model,
            query_len = request.query.len(),
            document_bytes = request.document.len(),
            "Opening Gemini streamGenerateContent request"
        );

        let response = self
            .post("streamGenerateContent", &[("alt", "sse")], &body)
            .await?;

        Ok(decode_event_stream(response.bytes_stream()))
    }

    async fn health_check(&self) -> bool {
        let url = format!(
            "{}/{}/models/{}",
            self.base_url, self.api_version, self.model
        );
        match self
            .http_client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

/// Parse one SSE payload into a fragment
fn parse_event(payload: &str) -> Result<ResponseFragment> {
    let event: GenerateContentResponse = serde_json::from_str(payload)
        .map_err(|e| Error::Backend(format!("Malformed Gemini stream event: {}", e)))?;
    event.check()?;
    Ok(ResponseFragment::new(event.texts()))
}

struct EventStreamState<S> {
    bytes: S,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    done: bool,
}

/// Turn a raw SSE byte stream into a fragment stream
///
/// The stream ends after the first error.
pub(crate) fn decode_event_stream<S, B, E>(bytes: S) -> FragmentStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<Error> + Send + 'static,
{
    let state = EventStreamState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(payload) = state.pending.pop_front() {
                let item = parse_event(&payload);
                if item.is_err() {
                    state.done = true;
                    state.pending.clear();
                }
                return Some((item, state));
            }
            if state.done {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(chunk.as_ref());
                    state.pending.extend(events);
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e.into()), state));
                }
                None => {
                    state.done = true;
                    state.pending.extend(state.decoder.finish());
                }
            }
        }
    })
    .boxed()
}
