//! Analysis pipeline: intake, one backend call, rendering
//!
//! Shared by the HTTP server and the CLI so both produce identical output.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::ai::{AIBackend, AIClient, AnalysisRequest, FragmentStream};
use crate::config::Settings;
use crate::error::Result;
use crate::intake::Submission;
use crate::prompts::SystemPromptProvider;
use crate::render::{self, RenderMode};

/// Runs submissions through the backend and renders the answers
#[derive(Clone)]
pub struct Analyzer {
    ai: AIClient,
    prompts: Arc<dyn SystemPromptProvider>,
    mode: RenderMode,
}

impl Analyzer {
    /// Create an analyzer
    ///
    /// In structured mode the backend is asked for raw JSON output.
    pub fn new(ai: AIClient, prompts: Arc<dyn SystemPromptProvider>, mode: RenderMode) -> Self {
        Self {
            ai: ai.with_json_output(mode == RenderMode::Structured),
            prompts,
            mode,
        }
    }

    /// Create from settings; None when the backend is not configured
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        let ai = AIClient::from_settings(settings)?;
        Some(Self::new(
            ai,
            Arc::new(settings.prompt_source()),
            settings.render_mode,
        ))
    }

    pub fn ai(&self) -> &AIClient {
        &self.ai
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Validate a submission and build its backend request
    pub async fn prepare(&self, submission: Submission) -> Result<AnalysisRequest> {
        submission.build_request(self.prompts.as_ref()).await
    }

    /// Fetch the complete answer text for a submission
    pub async fn answer(&self, submission: Submission) -> Result<String> {
        let request = self.prepare(submission).await?;
        let started = Instant::now();
        let answer = self.ai.generate(&request).await?;
        info!(
            backend = self.ai.kind(),
            model = %self.ai.model(),
            answer_len = answer.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Backend answered"
        );
        Ok(answer)
    }

    /// Run the full pipeline and return the rendered HTML fragment
    pub async fn analyze(&self, submission: Submission) -> Result<String> {
        let answer = self.answer(submission).await?;
        let html = render::render(self.mode, &answer)?;
        debug!(mode = %self.mode, html_len = html.len(), "Rendered answer");
        Ok(html)
    }

    /// Validate a submission and open a streaming backend call
    pub async fn analyze_stream(&self, submission: Submission) -> Result<FragmentStream> {
        let request = self.prepare(submission).await?;
        debug!(backend = self.ai.kind(), model = %self.ai.model(), "Opening answer stream");
        self.ai.generate_stream(&request).await
    }
}
