//! Slot-filling dialog — collects a fixed list of slots through child prompts.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::context::{DialogContext, DialogTurnResult};
use super::dialog::Dialog;
use super::prompt::PromptKind;
use super::slot::{SlotDefinition, SlotValue, SlotValues};
use super::stack::FrameState;
use crate::error::DialogError;

/// Persisted state of an active slot-filling frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotFillingState {
    /// Values captured so far.
    pub values: SlotValues,
    /// Slot whose prompt is currently on the stack above this frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
}

/// Asks for each unfilled slot in declaration order and ends with the full
/// [`SlotValues`] map.
///
/// Begin options may seed values; seeded slots are never asked again.
#[derive(Debug, Clone)]
pub struct SlotFillingDialog {
    id: String,
    slots: Vec<SlotDefinition>,
}

impl SlotFillingDialog {
    /// Build the dialog. Slot names must be unique and choice slots need at
    /// least one choice.
    pub fn new(id: impl Into<String>, slots: Vec<SlotDefinition>) -> Result<Self, DialogError> {
        let mut seen = HashSet::new();
        for slot in &slots {
            if !seen.insert(slot.name()) {
                return Err(DialogError::DuplicateSlot {
                    name: slot.name().to_string(),
                });
            }
            if slot.kind() == PromptKind::Choice && slot.choices().is_empty() {
                return Err(DialogError::MissingChoices {
                    slot: slot.name().to_string(),
                });
            }
        }
        Ok(Self {
            id: id.into(),
            slots,
        })
    }

    pub fn slots(&self) -> &[SlotDefinition] {
        &self.slots
    }

    fn state<'s>(
        &self,
        dc: &'s mut DialogContext<'_>,
    ) -> Result<&'s mut SlotFillingState, DialogError> {
        match dc.active_state_mut()? {
            FrameState::SlotFilling(state) => Ok(state),
            _ => Err(DialogError::StateMismatch {
                dialog_id: self.id.clone(),
            }),
        }
    }

    /// Prompt for the first unfilled slot, or end with all values.
    fn next_slot(&self, dc: &mut DialogContext<'_>) -> Result<DialogTurnResult, DialogError> {
        let state = self.state(dc)?;
        let pending = self
            .slots
            .iter()
            .find(|slot| !state.values.contains_key(slot.name()));

        match pending {
            Some(slot) => {
                state.current = Some(slot.name().to_string());
                debug!(dialog_id = %self.id, slot = slot.name(), "Asking for slot");
                let options = serde_json::to_value(slot.prompt_options())?;
                dc.begin_dialog(slot.kind().dialog_id(), Some(options))
            }
            None => {
                state.current = None;
                let values = serde_json::to_value(&state.values)?;
                debug!(dialog_id = %self.id, "All slots filled");
                dc.end_dialog(Some(values))
            }
        }
    }
}

impl Dialog for SlotFillingDialog {
    fn id(&self) -> &str {
        &self.id
    }

    fn initial_state(&self, options: Option<Value>) -> Result<FrameState, DialogError> {
        let values = match options {
            Some(Value::Null) | None => SlotValues::new(),
            Some(seed) => serde_json::from_value(seed)?,
        };
        Ok(FrameState::SlotFilling(SlotFillingState {
            values,
            current: None,
        }))
    }

    fn begin(&self, dc: &mut DialogContext<'_>) -> Result<DialogTurnResult, DialogError> {
        self.next_slot(dc)
    }

    fn resume(
        &self,
        dc: &mut DialogContext<'_>,
        result: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        let state = self.state(dc)?;
        if let (Some(name), Some(result)) = (state.current.take(), result) {
            let value: SlotValue = serde_json::from_value(result)?;
            debug!(dialog_id = %self.id, slot = %name, value = %value, "Slot filled");
            state.values.insert(name, value);
        }
        self.next_slot(dc)
    }
}
