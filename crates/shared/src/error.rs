//! Error taxonomy shared by every stage of the command pipeline.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Error parsing command: {message}")]
    Parse { message: String },

    #[error("Error while executing command: {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Request error: {0}")]
    Transport(String),

    #[error("Unexpected response format: {0}")]
    Shape(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to access {path:?}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Conversation log {path:?} is malformed: {source}")]
    CorruptLog {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl PipelineError {
    pub fn parse(message: impl Into<String>) -> Self {
        PipelineError::Parse {
            message: message.into(),
        }
    }
}
