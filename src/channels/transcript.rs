//! Transcript channel — collects replies instead of sending them.
//!
//! Used by request/response transports (the HTTP route returns the collected
//! replies as its body) and by tests.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::channels::Channel;
use crate::dialogs::Outbound;
use crate::error::ChannelError;

/// A reply captured by a [`Transcript`].
#[derive(Debug, Clone, PartialEq)]
pub struct Delivered {
    pub conversation_id: String,
    pub message: Outbound,
}

/// Channel that records every reply in order.
#[derive(Default)]
pub struct Transcript {
    delivered: Mutex<Vec<Delivered>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything recorded so far.
    pub async fn take(&self) -> Vec<Delivered> {
        std::mem::take(&mut *self.delivered.lock().await)
    }

    /// Texts of everything recorded so far, without draining.
    pub async fn texts(&self) -> Vec<String> {
        self.delivered
            .lock()
            .await
            .iter()
            .filter_map(|d| d.message.text().map(str::to_string))
            .collect()
    }

    async fn record(&self, conversation_id: &str, message: Outbound) {
        self.delivered.lock().await.push(Delivered {
            conversation_id: conversation_id.to_string(),
            message,
        });
    }
}

#[async_trait]
impl Channel for Transcript {
    fn name(&self) -> &str {
        "transcript"
    }

    async fn send_text(&self, conversation_id: &str, text: &str) -> Result<(), ChannelError> {
        self.record(conversation_id, Outbound::Text(text.to_string()))
            .await;
        Ok(())
    }

    async fn send_structured(
        &self,
        conversation_id: &str,
        payload: &Value,
    ) -> Result<(), ChannelError> {
        self.record(conversation_id, Outbound::Structured(payload.clone()))
            .await;
        Ok(())
    }
}
