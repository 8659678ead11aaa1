//! `StateStore` trait — the single async interface for conversation state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::dialogs::DialogStackState;
use crate::error::StorageError;

/// Per-conversation flags persisted alongside the dialog stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationFlags {
    /// Set once the welcome message has been sent. Never reset.
    #[serde(default)]
    pub welcomed: bool,
}

/// Everything persisted for one conversation between turns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    #[serde(default)]
    pub dialog_stack: DialogStackState,
    #[serde(default)]
    pub flags: ConversationFlags,
}

/// Backend-agnostic storage for conversation state.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load a conversation's state. Unknown conversations load as the default
    /// (empty stack, not welcomed).
    async fn load(&self, conversation_id: &str) -> Result<ConversationState, StorageError>;

    /// Persist a conversation's state, replacing what was there.
    async fn save(&self, conversation_id: &str, state: &ConversationState)
    -> Result<(), StorageError>;

    /// Forget a conversation. Returns whether anything was stored.
    async fn delete(&self, conversation_id: &str) -> Result<bool, StorageError>;
}

/// Serialize state the same way for every backend.
pub(crate) fn encode_state(state: &ConversationState) -> Result<String, StorageError> {
    serde_json::to_string(state).map_err(|e| StorageError::Serialization(e.to_string()))
}

pub(crate) fn decode_state(raw: &str) -> Result<ConversationState, StorageError> {
    serde_json::from_str(raw).map_err(|e| StorageError::Serialization(e.to_string()))
}
