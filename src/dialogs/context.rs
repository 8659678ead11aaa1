//! Turn and dialog contexts — what a dialog sees while handling one turn.

use serde_json::Value;
use tracing::debug;

use super::set::DialogSet;
use super::stack::{DialogFrame, DialogStackState, FrameState};
use crate::error::DialogError;

/// A message queued for delivery at the end of the turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Text(String),
    Structured(Value),
}

impl Outbound {
    /// Human-readable text of the message, if it carries any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Structured(payload) => payload.get("text").and_then(Value::as_str),
        }
    }
}

/// Per-turn scratch state: the inbound text and the replies produced so far.
///
/// Replies are buffered and only delivered after conversation state has been
/// saved.
#[derive(Debug, Clone)]
pub struct TurnContext {
    conversation_id: String,
    text: String,
    outbound: Vec<Outbound>,
    responded: bool,
}

impl TurnContext {
    pub fn new(conversation_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            text: text.into(),
            outbound: Vec::new(),
            responded: false,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Raw text of the inbound message (empty for non-message events).
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn send_text(&mut self, text: impl Into<String>) {
        self.outbound.push(Outbound::Text(text.into()));
        self.responded = true;
    }

    pub fn send_structured(&mut self, payload: Value) {
        self.outbound.push(Outbound::Structured(payload));
        self.responded = true;
    }

    /// Whether anything has been sent this turn.
    pub fn responded(&self) -> bool {
        self.responded
    }

    pub fn outbound(&self) -> &[Outbound] {
        &self.outbound
    }

    pub fn take_outbound(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbound)
    }

    /// Drop queued replies (used when a turn fails part-way).
    pub fn discard_outbound(&mut self) {
        self.outbound.clear();
    }
}

/// Outcome of a stack operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogTurnResult {
    /// Nothing was on the stack.
    Empty,
    /// The active dialog is waiting for the next user message.
    Waiting,
    /// The outermost dialog ended with this result; the stack is now empty.
    Complete(Option<Value>),
    /// The stack was unwound by a cancel.
    Cancelled,
}

/// The dialog stack of one conversation bound to a dialog set for one turn.
pub struct DialogContext<'a> {
    dialogs: &'a DialogSet,
    stack: &'a mut DialogStackState,
    pub turn: &'a mut TurnContext,
}

impl<'a> DialogContext<'a> {
    pub fn new(
        dialogs: &'a DialogSet,
        stack: &'a mut DialogStackState,
        turn: &'a mut TurnContext,
    ) -> Self {
        Self {
            dialogs,
            stack,
            turn,
        }
    }

    pub fn active_dialog(&self) -> Option<&DialogFrame> {
        self.stack.active()
    }

    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// State of the active frame.
    pub fn active_state_mut(&mut self) -> Result<&mut FrameState, DialogError> {
        self.stack
            .active_mut()
            .map(|frame| &mut frame.state)
            .ok_or(DialogError::NoActiveDialog)
    }

    /// Push a frame for `dialog_id` and run its entry point.
    pub fn begin_dialog(
        &mut self,
        dialog_id: &str,
        options: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        let dialog = self
            .dialogs
            .find(dialog_id)
            .ok_or_else(|| DialogError::UnknownDialog {
                id: dialog_id.to_string(),
            })?;

        let state = dialog.initial_state(options)?;
        let kind = state.kind();
        self.stack.push(DialogFrame {
            dialog_id: dialog_id.to_string(),
            state,
        });
        debug!(
            conversation_id = %self.turn.conversation_id(),
            dialog_id,
            kind,
            depth = self.stack.depth(),
            "Dialog begun"
        );

        dialog.begin(self)
    }

    /// Hand the current input to the active dialog.
    pub fn continue_dialog(&mut self) -> Result<DialogTurnResult, DialogError> {
        let Some(frame) = self.stack.active() else {
            return Ok(DialogTurnResult::Empty);
        };
        let dialog_id = frame.dialog_id.clone();
        let dialog = self
            .dialogs
            .find(&dialog_id)
            .ok_or(DialogError::UnknownDialog { id: dialog_id })?;

        dialog.continue_dialog(self)
    }

    /// Pop the active frame and deliver `result` to its parent, if any.
    pub fn end_dialog(&mut self, result: Option<Value>) -> Result<DialogTurnResult, DialogError> {
        let ended = self.stack.pop().ok_or(DialogError::NoActiveDialog)?;
        debug!(
            conversation_id = %self.turn.conversation_id(),
            dialog_id = %ended.dialog_id,
            kind = ended.state.kind(),
            depth = self.stack.depth(),
            "Dialog ended"
        );

        let Some(parent) = self.stack.active() else {
            return Ok(DialogTurnResult::Complete(result));
        };
        let parent_id = parent.dialog_id.clone();
        let dialog = self
            .dialogs
            .find(&parent_id)
            .ok_or(DialogError::UnknownDialog { id: parent_id })?;

        dialog.resume(self, result)
    }

    /// Unwind the whole stack.
    pub fn cancel_all_dialogs(&mut self) -> DialogTurnResult {
        if self.stack.is_empty() {
            return DialogTurnResult::Empty;
        }
        debug!(
            conversation_id = %self.turn.conversation_id(),
            depth = self.stack.depth(),
            "Cancelling all dialogs"
        );
        self.stack.clear();
        DialogTurnResult::Cancelled
    }
}
