//! Form submission handler

use std::sync::Arc;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use tokio::time::Instant;
use tracing::debug;

use clausewise_core::{Error, Submission, DOCUMENT_FIELD, QUERY_FIELD};

use super::stream::stream_body;
use crate::{AppError, AppState};

/// POST /submit - Analyze a document against a query
///
/// Expects multipart form with:
/// - query: the question (required, non-blank)
/// - document_file: the PDF (required, exactly one, non-empty)
///
/// Returns an HTML fragment, streamed when streaming is enabled.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let deadline = Instant::now() + state.config.request_timeout;

    let multipart = multipart.map_err(|e| Error::BadForm(e.body_text()))?;
    let submission = tokio::time::timeout_at(deadline, read_form(multipart))
        .await
        .map_err(|_| AppError::gateway_timeout("Timed out reading the form submission"))??;

    submit_core(&state, submission, deadline).await
}

/// Extract fields from the multipart form
async fn read_form(mut multipart: Multipart) -> Result<Submission, AppError> {
    let mut submission = Submission::new();

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            QUERY_FIELD => {
                let value = field.text().await.map_err(form_error)?;
                submission.set_query(value);
            }
            DOCUMENT_FIELD => {
                let bytes = field.bytes().await.map_err(form_error)?;
                submission.push_document(bytes.to_vec());
            }
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }

    Ok(submission)
}

/// Map a multipart read failure, keeping body-limit rejections as 413
fn form_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::payload_too_large(&err.body_text())
    } else {
        Error::BadForm(err.body_text()).into()
    }
}

/// Core submission logic - separated for testability
///
/// Runs the pipeline for an already extracted submission. Everything up to
/// the first byte of the answer is bounded by `deadline`.
pub async fn submit_core(
    state: &AppState,
    submission: Submission,
    deadline: Instant,
) -> Result<Response, AppError> {
    let analyzer = &state.analyzer;

    if state.streaming() {
        let stream = tokio::time::timeout_at(deadline, analyzer.analyze_stream(submission))
            .await
            .map_err(|_| AppError::gateway_timeout("Timed out waiting for the AI backend"))??;

        return Ok((
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            stream_body(stream, deadline),
        )
            .into_response());
    }

    let html = tokio::time::timeout_at(deadline, analyzer.analyze(submission))
        .await
        .map_err(|_| AppError::gateway_timeout("Timed out waiting for the AI backend"))??;

    Ok(Html(html).into_response())
}
