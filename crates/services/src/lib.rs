//! Persistence services: the last-command slot and the conversation log

pub mod conversation_log;
pub mod history;

pub use conversation_log::{ConversationLog, JsonConversationLog, MemoryConversationLog};
pub use history::{CommandHistoryStore, FileCommandHistory, MemoryCommandHistory};
