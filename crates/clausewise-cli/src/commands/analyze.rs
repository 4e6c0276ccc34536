//! Analyze command implementation

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clausewise_core::ai::AIBackend;
use clausewise_core::{Analyzer, Settings, Submission};
use futures::StreamExt;
use tracing::info;

/// Run one query against a local PDF and print the result
///
/// With streaming enabled (plain mode) the raw answer is printed as it
/// arrives; otherwise the rendered HTML fragment is printed. Either way the
/// backend call is bounded by the configured request timeout.
pub async fn cmd_analyze(settings: &Settings, query: &str, file: &Path) -> Result<()> {
    let analyzer = analyzer_for(settings)?;
    let submission = read_submission(query, file).await?;
    info!(
        "Analyzing {} with {} ({} mode)",
        file.display(),
        analyzer.ai().model(),
        analyzer.mode()
    );

    let timeout = settings.request_timeout();
    let mut stdout = std::io::stdout();
    if settings.streams() {
        tokio::time::timeout(timeout, stream_answer(&analyzer, submission, &mut stdout))
            .await
            .map_err(|_| timed_out(timeout))??;
        writeln!(stdout)?;
    } else {
        let html = analyze_html(&analyzer, submission, timeout).await?;
        writeln!(stdout, "{}", html)?;
    }
    Ok(())
}

/// Render the answer as HTML, giving up after `timeout`
pub async fn analyze_html(
    analyzer: &Analyzer,
    submission: Submission,
    timeout: Duration,
) -> Result<String> {
    let html = tokio::time::timeout(timeout, analyzer.analyze(submission))
        .await
        .map_err(|_| timed_out(timeout))??;
    Ok(html)
}

fn timed_out(timeout: Duration) -> anyhow::Error {
    anyhow!("Timed out after {:?} waiting for the AI backend", timeout)
}

/// Build the analyzer, failing with setup hints when no backend is configured
pub fn analyzer_for(settings: &Settings) -> Result<Analyzer> {
    Analyzer::from_settings(settings).ok_or_else(|| {
        anyhow!("Gemini backend not configured: set GEMINI_API_KEY (or AI_BACKEND=mock)")
    })
}

/// Read the document and pair it with the query
pub async fn read_submission(query: &str, file: &Path) -> Result<Submission> {
    let document = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read document: {}", file.display()))?;
    Ok(Submission::from_parts(query, document))
}

/// Write answer text to `out` fragment by fragment
pub async fn stream_answer<W: Write>(
    analyzer: &Analyzer,
    submission: Submission,
    out: &mut W,
) -> Result<usize> {
    let mut stream = analyzer.analyze_stream(submission).await?;
    let mut written = 0;
    while let Some(fragment) = stream.next().await {
        let text = fragment.context("Answer stream failed")?.text();
        out.write_all(text.as_bytes())?;
        out.flush()?;
        written += text.len();
    }
    if written == 0 {
        return Err(clausewise_core::Error::EmptyResponse.into());
    }
    Ok(written)
}
