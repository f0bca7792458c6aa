//! Completion endpoint clients

pub mod completion;

pub use completion::{CompletionClient, HttpCompletionClient};
