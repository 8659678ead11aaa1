//! Error types for the order bot.

/// Error returned from a conversation turn.
///
/// Dialog failures never get here: the controller answers them with the
/// apology and resets the stack.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Conversation state storage errors.
///
/// A turn that hits one of these is not durably advanced.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to open storage: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send message on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),
}

/// Dialog orchestration errors.
///
/// Input that fails a prompt's validation is not an error: prompts recover
/// from it locally by re-asking.
#[derive(Debug, thiserror::Error)]
pub enum DialogError {
    #[error("Dialog {id} is not registered")]
    UnknownDialog { id: String },

    #[error("Dialog {id} is already registered")]
    DuplicateDialog { id: String },

    #[error("Slot {name} is declared more than once")]
    DuplicateSlot { name: String },

    #[error("Choice slot {slot} has no choices")]
    MissingChoices { slot: String },

    #[error("Frame state does not belong to dialog {dialog_id}")]
    StateMismatch { dialog_id: String },

    #[error("No active dialog on the stack")]
    NoActiveDialog,

    #[error("Invalid options for dialog {dialog_id}: {reason}")]
    InvalidOptions { dialog_id: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result of a conversation turn.
pub type Result<T> = std::result::Result<T, Error>;
