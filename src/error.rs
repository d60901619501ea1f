//! Error type shared by the worker, the grammar registry and the markup plugin

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid theme {path}: {source}")]
    Theme {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("malformed request: {0}")]
    MalformedRequest(#[source] serde_json::Error),

    #[error("failed to serialize response: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("unknown language `{0}`")]
    UnknownLanguage(String),

    #[error("grammar for {language} is unavailable: {reason}")]
    GrammarUnavailable { language: String, reason: String },

    #[error("failed to install {language} grammar: {reason}")]
    Install { language: String, reason: String },

    #[error("tree-sitter could not parse {language} source")]
    Parse { language: String },

    #[error("highlighter initialization failed: {0}")]
    EngineInit(String),

    #[error("highlighter task failed: {0}")]
    EngineTask(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("renderer failed: {0}")]
    Renderer(String),
}

impl Error {
    pub(crate) fn install(language: &str, reason: impl Into<String>) -> Self {
        Error::Install {
            language: language.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unavailable(language: &str, reason: impl Into<String>) -> Self {
        Error::GrammarUnavailable {
            language: language.to_string(),
            reason: reason.into(),
        }
    }
}
