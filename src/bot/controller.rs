//! ConversationController — the per-turn entry point.
//!
//! Each turn: load state, run the dialog stack (or the welcome / cancel
//! handling), save state, and only then deliver the replies.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::activity::{EventKind, InboundEvent, Participant};
use crate::channels::Channel;
use crate::config::BotConfig;
use crate::dialogs::{DialogSet, DialogStackState, TurnContext};
use crate::error::{self, DialogError, Error, StorageError};
use crate::store::{ConversationFlags, ConversationState, StateStore};

/// Routes inbound events into the dialog engine, one conversation turn at a time.
pub struct ConversationController {
    dialogs: Arc<DialogSet>,
    root_dialog: String,
    store: Arc<dyn StateStore>,
    config: BotConfig,
    /// One lock per conversation with a turn in flight.
    turn_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ConversationController {
    /// Create a controller. `root_dialog` must be registered in `dialogs`.
    pub fn new(
        dialogs: Arc<DialogSet>,
        root_dialog: impl Into<String>,
        store: Arc<dyn StateStore>,
        config: BotConfig,
    ) -> Result<Self, DialogError> {
        let root_dialog = root_dialog.into();
        if !dialogs.has(&root_dialog) {
            return Err(DialogError::UnknownDialog { id: root_dialog });
        }
        Ok(Self {
            dialogs,
            root_dialog,
            store,
            config,
            turn_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Process one inbound event to completion and deliver its replies.
    ///
    /// A storage failure means the turn is not durably advanced: none of its
    /// replies are sent, only the generic apology, and the error is returned.
    /// Dialog failures are answered with the apology and reset the dialog
    /// stack.
    pub async fn handle_turn(&self, event: &InboundEvent, channel: &dyn Channel) -> error::Result<()> {
        let conversation_id = event.conversation_id.as_str();
        let lock = self.turn_lock(conversation_id).await;
        let result = {
            let _guard = lock.lock().await;
            let result = self.run_turn(event, channel).await;
            if let Err(Error::Storage(e)) = &result {
                error!(conversation_id, error = %e, "State store failed, turn not saved");
                if let Err(send_err) = channel
                    .send_text(conversation_id, &self.config.messages.apology)
                    .await
                {
                    warn!(conversation_id, error = %send_err, "Failed to deliver apology");
                }
            }
            result
        };
        drop(lock);
        self.release_turn_lock(conversation_id).await;
        result
    }

    async fn run_turn(&self, event: &InboundEvent, channel: &dyn Channel) -> error::Result<()> {
        let conversation_id = event.conversation_id.as_str();
        let mut state = self.load_state(conversation_id).await?;

        let text = match &event.kind {
            EventKind::TextMessage { text } => text.as_str(),
            _ => "",
        };
        let mut turn = TurnContext::new(conversation_id, text);

        match &event.kind {
            EventKind::TextMessage { .. } => {
                if let Err(e) = self.on_message(&mut state.dialog_stack, &mut turn) {
                    error!(conversation_id, error = %e, "Dialog turn failed, resetting dialog stack");
                    turn.discard_outbound();
                    state.dialog_stack.clear();
                    turn.send_text(&self.config.messages.apology);
                }
            }
            EventKind::MembersAdded { members } => {
                self.on_members_added(event, members, &mut state.flags, &mut turn);
            }
            EventKind::Other { .. } => {
                info!(conversation_id, "[{} event detected]", event.kind_name());
            }
        }

        self.store.save(conversation_id, &state).await?;

        let outbound = turn.take_outbound();
        debug!(
            conversation_id,
            replies = outbound.len(),
            depth = state.dialog_stack.depth(),
            "Turn complete"
        );
        channel.deliver(conversation_id, &outbound).await?;
        Ok(())
    }

    /// Load a conversation's state. State that no longer decodes is dropped
    /// so the conversation can start over instead of failing every turn.
    async fn load_state(&self, conversation_id: &str) -> Result<ConversationState, StorageError> {
        match self.store.load(conversation_id).await {
            Err(StorageError::Serialization(reason)) => {
                warn!(conversation_id, %reason, "Stored state is unreadable, resetting conversation");
                self.store.delete(conversation_id).await?;
                Ok(ConversationState::default())
            }
            other => other,
        }
    }

    /// Cancel keyword, then the active dialog, then a fresh root dialog.
    fn on_message(
        &self,
        stack: &mut DialogStackState,
        turn: &mut TurnContext,
    ) -> Result<(), DialogError> {
        let utterance = turn.text().trim().to_lowercase();
        let mut dc = self.dialogs.create_context(stack, turn);

        if utterance == self.config.cancel_keyword.to_lowercase() {
            if dc.active_dialog().is_some() {
                dc.cancel_all_dialogs();
                dc.turn.send_text(&self.config.messages.cancelled);
            } else {
                dc.turn.send_text(&self.config.messages.nothing_to_cancel);
            }
        }

        if !dc.turn.responded() {
            dc.continue_dialog()?;
        }

        if !dc.turn.responded() {
            dc.begin_dialog(&self.root_dialog, None)?;
        }

        Ok(())
    }

    /// Greet every joining member other than the bot, once per conversation.
    fn on_members_added(
        &self,
        event: &InboundEvent,
        members: &[Participant],
        flags: &mut ConversationFlags,
        turn: &mut TurnContext,
    ) {
        let bot_id = event.recipient_id.as_deref().unwrap_or(&self.config.bot_id);

        for member in members.iter().filter(|m| m.id != bot_id) {
            if flags.welcomed {
                debug!(conversation_id = %event.conversation_id, member = %member.id, "Already welcomed");
                continue;
            }
            let name = if member.name.is_empty() {
                &event.from.name
            } else {
                &member.name
            };
            turn.send_text(self.config.messages.welcome_for(name));
            flags.welcomed = true;
            info!(conversation_id = %event.conversation_id, member = %member.id, "Welcomed member");
        }
    }

    async fn turn_lock(&self, conversation_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.turn_locks.lock().await;
        Arc::clone(locks.entry(conversation_id.to_string()).or_default())
    }

    /// Drop the conversation's lock once no other turn is holding or waiting on it.
    async fn release_turn_lock(&self, conversation_id: &str) {
        let mut locks = self.turn_locks.lock().await;
        if locks
            .get(conversation_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(conversation_id);
        }
    }
}
