//! Dialog registry — maps dialog ids to shared dialog definitions.

use std::collections::HashMap;
use std::sync::Arc;

use super::context::DialogContext;
use super::context::TurnContext;
use super::dialog::Dialog;
use super::prompt::{Prompt, PromptKind};
use super::stack::DialogStackState;
use crate::error::DialogError;

/// Registry of the dialogs a bot can begin.
///
/// Built once at startup and shared read-only by every conversation.
#[derive(Default)]
pub struct DialogSet {
    dialogs: HashMap<String, Arc<dyn Dialog>>,
}

impl DialogSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A set with the text, number and choice prompts registered under
    /// their default ids.
    pub fn with_default_prompts() -> Self {
        let mut set = Self::new();
        for kind in [PromptKind::Text, PromptKind::Number, PromptKind::Choice] {
            set.dialogs
                .insert(kind.dialog_id().to_string(), Arc::new(Prompt::for_kind(kind)));
        }
        set
    }

    /// Register a dialog. Ids must be unique.
    pub fn add(&mut self, dialog: impl Dialog + 'static) -> Result<(), DialogError> {
        let id = dialog.id().to_string();
        if self.dialogs.contains_key(&id) {
            return Err(DialogError::DuplicateDialog { id });
        }
        tracing::debug!(dialog_id = %id, "Registered dialog");
        self.dialogs.insert(id, Arc::new(dialog));
        Ok(())
    }

    /// Get a dialog by id.
    pub fn find(&self, id: &str) -> Option<Arc<dyn Dialog>> {
        self.dialogs.get(id).cloned()
    }

    pub fn has(&self, id: &str) -> bool {
        self.dialogs.contains_key(id)
    }

    pub fn count(&self) -> usize {
        self.dialogs.len()
    }

    /// Bind a conversation's stack and the current turn to this set.
    pub fn create_context<'a>(
        &'a self,
        stack: &'a mut DialogStackState,
        turn: &'a mut TurnContext,
    ) -> DialogContext<'a> {
        DialogContext::new(self, stack, turn)
    }
}
