//! Role-tagged conversation log.
//!
//! The JSON backend reads the whole file, appends in memory and rewrites it.
//! Only one writer is expected; there is no locking.

use parking_lot::Mutex;
use shared::agent_api::{ChatMessage, Role};
use shared::PipelineError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub trait ConversationLog: Send + Sync {
    /// Every entry in submission order, seed first.
    fn entries(&self) -> Result<Vec<ChatMessage>, PipelineError>;

    fn append(&self, role: Role, content: &str) -> Result<(), PipelineError>;
}

/// Conversation log stored as a JSON array of `{role, content}` objects.
pub struct JsonConversationLog {
    path: PathBuf,
    system_message: String,
}

impl JsonConversationLog {
    pub fn new(path: PathBuf, system_message: impl Into<String>) -> Self {
        Self {
            path,
            system_message: system_message.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn seed(&self) -> Vec<ChatMessage> {
        vec![ChatMessage::system(self.system_message.clone())]
    }

    /// Read the log; `None` when the file does not exist yet.
    fn read(&self) -> Result<Option<Vec<ChatMessage>>, PipelineError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PipelineError::Persistence {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| PipelineError::CorruptLog {
                path: self.path.clone(),
                source,
            })
    }

    fn write(&self, messages: &[ChatMessage]) -> Result<(), PipelineError> {
        let json = serde_json::to_string_pretty(messages).map_err(|source| {
            PipelineError::CorruptLog {
                path: self.path.clone(),
                source,
            }
        })?;

        fs::write(&self.path, json).map_err(|source| PipelineError::Persistence {
            path: self.path.clone(),
            source,
        })
    }

    /// Create the log with its seed entry if it does not exist yet.
    pub fn ensure_exists(&self) -> Result<(), PipelineError> {
        if self.read()?.is_none() {
            tracing::warn!(path = ?self.path, "conversation log not found, creating a new one");
            self.write(&self.seed())?;
        }
        Ok(())
    }
}

impl ConversationLog for JsonConversationLog {
    fn entries(&self) -> Result<Vec<ChatMessage>, PipelineError> {
        Ok(self.read()?.unwrap_or_else(|| self.seed()))
    }

    fn append(&self, role: Role, content: &str) -> Result<(), PipelineError> {
        let mut messages = match self.read()? {
            Some(messages) => messages,
            None => {
                tracing::warn!(path = ?self.path, "conversation log not found, creating a new one");
                self.seed()
            }
        };

        messages.push(ChatMessage::new(role, content));
        self.write(&messages)
    }
}

/// In-memory log with the same seeding behavior.
pub struct MemoryConversationLog {
    messages: Mutex<Vec<ChatMessage>>,
}

impl MemoryConversationLog {
    pub fn new(system_message: impl Into<String>) -> Self {
        Self {
            messages: Mutex::new(vec![ChatMessage::system(system_message)]),
        }
    }
}

impl ConversationLog for MemoryConversationLog {
    fn entries(&self) -> Result<Vec<ChatMessage>, PipelineError> {
        Ok(self.messages.lock().clone())
    }

    fn append(&self, role: Role, content: &str) -> Result<(), PipelineError> {
        self.messages.lock().push(ChatMessage::new(role, content));
        Ok(())
    }
}
