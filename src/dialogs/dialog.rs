//! The resumable-dialog capability shared by every stack entry.

use serde_json::Value;

use super::context::{DialogContext, DialogTurnResult};
use super::stack::FrameState;
use crate::error::DialogError;

/// A dialog that can sit on the dialog stack.
///
/// Dialog objects are stateless and shared by all conversations; everything
/// that changes between turns lives in the frame's [`FrameState`].
pub trait Dialog: Send + Sync {
    /// Registry id.
    fn id(&self) -> &str;

    /// State for a fresh frame, built from the options passed to `begin_dialog`.
    fn initial_state(&self, options: Option<Value>) -> Result<FrameState, DialogError>;

    /// Entry point, called right after the frame is pushed.
    fn begin(&self, dc: &mut DialogContext<'_>) -> Result<DialogTurnResult, DialogError>;

    /// Called with new user input while this dialog is the top frame.
    fn continue_dialog(&self, dc: &mut DialogContext<'_>) -> Result<DialogTurnResult, DialogError> {
        dc.end_dialog(None)
    }

    /// Called when a child this dialog started has ended.
    fn resume(
        &self,
        dc: &mut DialogContext<'_>,
        result: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        dc.end_dialog(result)
    }
}
