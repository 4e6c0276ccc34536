//! Error types for Clausewise

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid form submission: {0}")]
    BadForm(String),

    #[error("Query is required")]
    MissingQuery,

    #[error("Document file is required")]
    MissingDocument,

    #[error("Only one document file may be uploaded")]
    DuplicateDocument,

    #[error("Uploaded document is empty")]
    EmptyDocument,

    #[error("Failed to read system prompt file {}: {source}", path.display())]
    SystemPrompt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("AI backend error: {0}")]
    Backend(String),

    #[error("AI backend returned an empty response")]
    EmptyResponse,

    #[error("Invalid response shape: {0}")]
    InvalidShape(String),
}

impl Error {
    /// Whether the error was caused by the submitted form rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::BadForm(_)
                | Error::MissingQuery
                | Error::MissingDocument
                | Error::DuplicateDocument
                | Error::EmptyDocument
        )
    }

    /// Whether the error came from the AI backend or its answer
    pub fn is_backend_error(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Backend(_)
                | Error::EmptyResponse
                | Error::InvalidShape(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
