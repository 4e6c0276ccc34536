//! HTML rendering of AI answers
//!
//! Two modes:
//! - `plain`: the answer text, escaped, inside a `<pre>` block
//! - `structured`: the answer parsed as [`StructuredAnalysis`](crate::models::StructuredAnalysis)
//!   and laid out section by section
//!
//! Every value taken from the answer is HTML-escaped, including values used
//! as CSS class fragments.

mod plain;
mod structured;

pub use plain::{render_plain, PLAIN_CLOSE, PLAIN_OPEN};
pub use structured::{render_analysis, render_structured};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How answers are turned into HTML
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Plain,
    Structured,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Structured => "structured",
        }
    }
}

impl std::str::FromStr for RenderMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "plain" | "text" => Ok(Self::Plain),
            "structured" | "json" => Ok(Self::Structured),
            _ => Err(Error::Config(format!("Unknown render mode: {}", s))),
        }
    }
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Render a complete answer in the given mode
pub fn render(mode: RenderMode, answer: &str) -> Result<String> {
    match mode {
        RenderMode::Plain => render_plain(answer),
        RenderMode::Structured => render_structured(answer),
    }
}

/// Escape text for use in HTML content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
