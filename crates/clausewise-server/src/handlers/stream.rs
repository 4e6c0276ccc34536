//! Streaming answer forwarder
//!
//! A spawned task pulls fragments from the backend and pushes escaped HTML
//! pieces through a bounded channel that backs the response body. The status
//! line is already sent by then, so later failures are reported inline as a
//! `stream-error` block. If the client goes away the next send fails and the
//! task drops the backend stream without pulling further.

use std::convert::Infallible;

use axum::body::Body;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, warn};

use clausewise_core::render::{escape_html, PLAIN_CLOSE, PLAIN_OPEN};
use clausewise_core::FragmentStream;

/// Pieces buffered between the forwarder and the response body
const CHANNEL_CAPACITY: usize = 16;

/// How a forwarded stream ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// Every fragment was delivered
    Completed { fragments: usize, bytes: usize },
    /// The backend failed (or sent nothing); a notice was appended
    Failed(String),
    /// The deadline passed; a notice was appended
    TimedOut,
    /// The client stopped reading
    Disconnected,
}

/// Spawn the forwarder and return the response body it feeds
pub fn stream_body(stream: FragmentStream, deadline: Instant) -> Body {
    let (tx, rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        match forward(stream, tx, deadline).await {
            ForwardOutcome::Completed { fragments, bytes } => {
                debug!(fragments, bytes, "Streamed answer delivered");
            }
            ForwardOutcome::Failed(message) => error!(error = %message, "Answer stream failed"),
            ForwardOutcome::TimedOut => warn!("Answer stream exceeded the request deadline"),
            ForwardOutcome::Disconnected => debug!("Client disconnected during answer stream"),
        }
    });

    Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>))
}

/// Markup closing the result container after a failure
fn error_notice(message: &str) -> String {
    format!(
        r#"</pre><div class="stream-error">{}</div></div></div>"#,
        escape_html(message)
    )
}

/// Pull fragments until the stream ends, fails, times out or the client leaves
pub async fn forward(
    mut stream: FragmentStream,
    tx: mpsc::Sender<String>,
    deadline: Instant,
) -> ForwardOutcome {
    if tx.send(PLAIN_OPEN.to_string()).await.is_err() {
        return ForwardOutcome::Disconnected;
    }

    let mut fragments = 0;
    let mut bytes = 0;

    loop {
        let next = match tokio::time::timeout_at(deadline, stream.next()).await {
            Ok(next) => next,
            Err(_) => {
                let _ = tx.send(error_notice("Request timed out")).await;
                return ForwardOutcome::TimedOut;
            }
        };

        match next {
            Some(Ok(fragment)) => {
                let text = fragment.text();
                if text.is_empty() {
                    continue;
                }
                fragments += 1;
                bytes += text.len();
                if tx.send(escape_html(&text)).await.is_err() {
                    return ForwardOutcome::Disconnected;
                }
            }
            Some(Err(e)) => {
                let message = e.to_string();
                let _ = tx.send(error_notice(&message)).await;
                return ForwardOutcome::Failed(message);
            }
            None if bytes == 0 => {
                let message = clausewise_core::Error::EmptyResponse.to_string();
                let _ = tx.send(error_notice(&message)).await;
                return ForwardOutcome::Failed(message);
            }
            None => {
                if tx.send(PLAIN_CLOSE.to_string()).await.is_err() {
                    return ForwardOutcome::Disconnected;
                }
                return ForwardOutcome::Completed { fragments, bytes };
            }
        }
    }
}
