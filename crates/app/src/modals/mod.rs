//! Interactive prompts for the terminal front-end.

pub mod credential_prompt;

pub use credential_prompt::CredentialPrompt;

/// Result from a prompt.
#[derive(Debug)]
pub enum ModalResult<T> {
    /// User hasn't made a decision yet
    Pending,
    /// User confirmed/submitted
    Confirmed(T),
    /// User cancelled
    Cancelled,
}

impl<T> ModalResult<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, ModalResult::Pending)
    }
}
