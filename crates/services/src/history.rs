//! Single-slot store for the most recently received command.
//!
//! The slot lets a later credential submission recover which command to
//! re-run. Saving overwrites; nothing is ever appended or deleted.

use parking_lot::Mutex;
use shared::PipelineError;
use std::fs;
use std::path::PathBuf;

pub trait CommandHistoryStore: Send + Sync {
    /// Overwrite the slot with `command`.
    fn save(&self, command: &str) -> Result<(), PipelineError>;

    /// The last saved command, or `None` when nothing usable is stored.
    fn load(&self) -> Option<String>;
}

/// History slot backed by a single text file.
///
/// The file must already exist: the store never creates it, so a
/// misconfigured path fails loudly instead of scattering history files.
pub struct FileCommandHistory {
    path: Option<PathBuf>,
}

impl FileCommandHistory {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

impl CommandHistoryStore for FileCommandHistory {
    fn save(&self, command: &str) -> Result<(), PipelineError> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| PipelineError::Config("history file location is not set".into()))?;

        if !path.is_file() {
            return Err(PipelineError::Config(format!(
                "history file {:?} does not exist",
                path
            )));
        }

        fs::write(path, command).map_err(|source| PipelineError::Persistence {
            path: path.clone(),
            source,
        })
    }

    fn load(&self) -> Option<String> {
        let Some(path) = self.path.as_ref() else {
            tracing::warn!("history file location is not set");
            return None;
        };

        match fs::read_to_string(path) {
            Ok(contents) => {
                let command = contents.trim();
                if command.is_empty() {
                    None
                } else {
                    Some(command.to_string())
                }
            }
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "failed to read last command");
                None
            }
        }
    }
}

/// In-memory slot for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryCommandHistory {
    slot: Mutex<Option<String>>,
}

impl MemoryCommandHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommandHistoryStore for MemoryCommandHistory {
    fn save(&self, command: &str) -> Result<(), PipelineError> {
        *self.slot.lock() = Some(command.to_string());
        Ok(())
    }

    fn load(&self) -> Option<String> {
        self.slot.lock().clone()
    }
}
