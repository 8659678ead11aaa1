//! The `Channel` trait — how replies leave the bot.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;

use crate::bot::InboundEvent;
use crate::dialogs::Outbound;
use crate::error::ChannelError;

/// Stream of inbound events produced by a channel's feed.
pub type EventStream = Pin<Box<dyn Stream<Item = InboundEvent> + Send>>;

/// A delivery mechanism for bot replies.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name (e.g. "cli", "http").
    fn name(&self) -> &str;

    /// Send a plain text reply.
    async fn send_text(&self, conversation_id: &str, text: &str) -> Result<(), ChannelError>;

    /// Send a structured reply (suggested actions, cards).
    async fn send_structured(
        &self,
        conversation_id: &str,
        payload: &Value,
    ) -> Result<(), ChannelError>;

    /// Deliver a turn's replies in order.
    async fn deliver(
        &self,
        conversation_id: &str,
        outbound: &[Outbound],
    ) -> Result<(), ChannelError> {
        for message in outbound {
            match message {
                Outbound::Text(text) => self.send_text(conversation_id, text).await?,
                Outbound::Structured(payload) => {
                    self.send_structured(conversation_id, payload).await?
                }
            }
        }
        Ok(())
    }
}
