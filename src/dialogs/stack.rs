//! Dialog stack — the persisted per-conversation list of active frames.
//!
//! The last frame is the only one that receives user input. Frames are only
//! ever pushed, popped, or cleared all at once.

use serde::{Deserialize, Serialize};

use super::prompt::PromptState;
use super::slot_filling::SlotFillingState;
use super::waterfall::WaterfallState;

/// Per-frame state, tagged by the kind of dialog that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrameState {
    Prompt(PromptState),
    SlotFilling(SlotFillingState),
    Waterfall(WaterfallState),
}

impl FrameState {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Prompt(_) => "prompt",
            Self::SlotFilling(_) => "slot_filling",
            Self::Waterfall(_) => "waterfall",
        }
    }
}

/// One entry on the dialog stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogFrame {
    pub dialog_id: String,
    pub state: FrameState,
}

/// Ordered frames, innermost last. Empty means no active dialog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DialogStackState {
    frames: Vec<DialogFrame>,
}

impl DialogStackState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The active (innermost) frame.
    pub fn active(&self) -> Option<&DialogFrame> {
        self.frames.last()
    }

    /// Frames from outermost to innermost.
    pub fn frames(&self) -> &[DialogFrame] {
        &self.frames
    }

    pub(crate) fn active_mut(&mut self) -> Option<&mut DialogFrame> {
        self.frames.last_mut()
    }

    pub(crate) fn push(&mut self, frame: DialogFrame) {
        self.frames.push(frame);
    }

    pub(crate) fn pop(&mut self) -> Option<DialogFrame> {
        self.frames.pop()
    }

    pub(crate) fn clear(&mut self) {
        self.frames.clear();
    }
}
