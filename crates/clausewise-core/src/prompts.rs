//! System prompt providers
//!
//! The system prompt comes from exactly one source:
//! 1. Inline text (the embedded default, or a string from settings)
//! 2. A file on disk, read fresh on every request so edits apply immediately

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Embedded default prompt (compiled into binary)
pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("../../../prompts/system_prompt.txt");

/// Supplies the system prompt for one request
#[async_trait]
pub trait SystemPromptProvider: Send + Sync {
    async fn load_system_prompt(&self) -> Result<String>;
}

/// Where the system prompt comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemPromptSource {
    Inline(String),
    File(PathBuf),
}

impl SystemPromptSource {
    /// Source backed by the embedded default prompt
    pub fn embedded() -> Self {
        SystemPromptSource::Inline(DEFAULT_SYSTEM_PROMPT.to_string())
    }

    pub fn file(path: impl AsRef<Path>) -> Self {
        SystemPromptSource::File(path.as_ref().to_path_buf())
    }

    /// Human-readable description (for startup logging)
    pub fn describe(&self) -> String {
        match self {
            SystemPromptSource::Inline(text) if text == DEFAULT_SYSTEM_PROMPT => {
                "embedded default".to_string()
            }
            SystemPromptSource::Inline(_) => "inline".to_string(),
            SystemPromptSource::File(path) => format!("file {}", path.display()),
        }
    }
}

impl Default for SystemPromptSource {
    fn default() -> Self {
        Self::embedded()
    }
}

#[async_trait]
impl SystemPromptProvider for SystemPromptSource {
    async fn load_system_prompt(&self) -> Result<String> {
        match self {
            SystemPromptSource::Inline(text) => Ok(text.clone()),
            SystemPromptSource::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| Error::SystemPrompt {
                        path: path.clone(),
                        source,
                    })
            }
        }
    }
}
