//! Plain-text answer rendering

use crate::error::{Error, Result};

use super::escape_html;

/// Markup emitted before the answer text
pub const PLAIN_OPEN: &str =
    r#"<div class="response-content"><h3>Analysis Results</h3><div class="analysis-result"><pre>"#;

/// Markup emitted after the answer text
pub const PLAIN_CLOSE: &str = "</pre></div></div>";

/// Wrap the escaped answer in the results container
pub fn render_plain(answer: &str) -> Result<String> {
    if answer.trim().is_empty() {
        return Err(Error::EmptyResponse);
    }
    Ok(format!("{}{}{}", PLAIN_OPEN, escape_html(answer), PLAIN_CLOSE))
}
