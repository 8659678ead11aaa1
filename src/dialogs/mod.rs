//! Dialog engine — a per-conversation stack of resumable dialogs.
//!
//! Prompts collect one value, slot-filling dialogs chain prompts into a
//! record, and waterfalls sequence steps around child dialogs. Only the top
//! frame of the stack sees user input; results bubble up as frames end.

pub mod context;
pub mod dialog;
pub mod prompt;
pub mod set;
pub mod slot;
pub mod slot_filling;
pub mod stack;
pub mod waterfall;

pub use context::{DialogContext, DialogTurnResult, Outbound, TurnContext};
pub use dialog::Dialog;
pub use prompt::{Choice, Prompt, PromptKind, PromptOptions, RecognizeError};
pub use set::DialogSet;
pub use slot::{FoundChoice, SlotDefinition, SlotValue, SlotValues};
pub use slot_filling::SlotFillingDialog;
pub use stack::{DialogFrame, DialogStackState, FrameState};
pub use waterfall::{StepDirective, WaterfallDialog, WaterfallStepContext};
