use thiserror::Error;

use crate::{
    chat::ChatError,
    state::{InvalidTransition, PauseError},
};

/// Errors surfaced by the command surface and the engine.
///
/// Everything here is reported to the caller as a user-visible message;
/// nothing unwinds the engine.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The chat collaborator failed; messages or event streams are
    /// unavailable.
    #[error("chat unavailable: {0}")]
    ChatUnavailable(#[source] ChatError),
    /// Invalid input provided by the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// No active game in the targeted channel.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<ChatError> for ServiceError {
    fn from(err: ChatError) -> Self {
        ServiceError::ChatUnavailable(err)
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::InvalidState(err.to_string())
    }
}

impl From<PauseError> for ServiceError {
    fn from(err: PauseError) -> Self {
        ServiceError::InvalidState(err.to_string())
    }
}
