//! In-memory state store for local runs and tests.
//!
//! State is kept as serialized JSON so it goes through exactly the same
//! encoding as the durable backend. Everything is lost on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::traits::{ConversationState, StateStore, decode_state, encode_state};
use crate::error::StorageError;

/// Conversation state held in a process-local map.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored conversations.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Store an already-encoded entry as-is.
    #[cfg(test)]
    pub(crate) async fn put_raw(&self, conversation_id: &str, raw: &str) {
        self.entries
            .write()
            .await
            .insert(conversation_id.to_string(), raw.to_string());
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self, conversation_id: &str) -> Result<ConversationState, StorageError> {
        match self.entries.read().await.get(conversation_id) {
            Some(raw) => decode_state(raw),
            None => Ok(ConversationState::default()),
        }
    }

    async fn save(
        &self,
        conversation_id: &str,
        state: &ConversationState,
    ) -> Result<(), StorageError> {
        let raw = encode_state(state)?;
        self.entries
            .write()
            .await
            .insert(conversation_id.to_string(), raw);
        debug!(conversation_id, depth = state.dialog_stack.depth(), "State saved");
        Ok(())
    }

    async fn delete(&self, conversation_id: &str) -> Result<bool, StorageError> {
        Ok(self.entries.write().await.remove(conversation_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_conversation_loads_default() {
        let store = MemoryStore::new();
        let state = store.load("nobody").await.unwrap();
        assert_eq!(state, ConversationState::default());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn save_then_load() {
        let store = MemoryStore::new();
        let mut state = ConversationState::default();
        state.flags.welcomed = true;

        store.save("c1", &state).await.unwrap();
        assert_eq!(store.load("c1").await.unwrap(), state);
        assert_eq!(store.load("c2").await.unwrap(), ConversationState::default());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn delete_removes() {
        let store = MemoryStore::new();
        store.save("c1", &ConversationState::default()).await.unwrap();
        assert!(store.delete("c1").await.unwrap());
        assert!(!store.delete("c1").await.unwrap());
    }
}
