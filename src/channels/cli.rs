//! CLI channel — stdin/stdout REPL for local testing.

use async_trait::async_trait;
use futures::stream;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::bot::{InboundEvent, Participant};
use crate::channels::{Channel, EventStream};
use crate::error::ChannelError;

/// Conversation id used for the local REPL.
pub const CLI_CONVERSATION_ID: &str = "cli";

/// A simple CLI channel that reads from stdin and writes to stdout.
pub struct CliChannel {
    user: Participant,
}

impl CliChannel {
    pub fn new() -> Self {
        Self {
            user: Participant::new("local-user", "User"),
        }
    }

    /// Start reading stdin. The stream opens with a join event for the local
    /// user, then yields one text event per non-empty line until EOF.
    pub fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let user = self.user.clone();

        let joined = InboundEvent::members_added(CLI_CONVERSATION_ID, user.clone(), vec![user.clone()]);
        tx.send(joined).map_err(|e| ChannelError::StartupFailed {
            name: "cli".to_string(),
            reason: e.to_string(),
        })?;

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        let event = InboundEvent::text(CLI_CONVERSATION_ID, user.clone(), line);
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Ok(Box::pin(stream))
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a structured payload for the terminal: its text, or the raw JSON.
fn render_structured(payload: &Value) -> String {
    match payload.get("text").and_then(Value::as_str) {
        Some(text) => text.to_string(),
        None => payload.to_string(),
    }
}

async fn write_reply(text: &str) -> Result<(), ChannelError> {
    let send_failed = |e: std::io::Error| ChannelError::SendFailed {
        name: "cli".to_string(),
        reason: e.to_string(),
    };
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(format!("\n{text}\n\n").as_bytes())
        .await
        .map_err(send_failed)?;
    stdout.flush().await.map_err(send_failed)?;
    eprint!("> ");
    Ok(())
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn send_text(&self, _conversation_id: &str, text: &str) -> Result<(), ChannelError> {
        write_reply(text).await
    }

    async fn send_structured(
        &self,
        _conversation_id: &str,
        payload: &Value,
    ) -> Result<(), ChannelError> {
        write_reply(&render_structured(payload)).await
    }
}
