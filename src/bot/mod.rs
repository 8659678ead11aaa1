//! The order bot — per-turn controller, inbound events, and the order flow.

pub mod activity;
pub mod controller;
pub mod order;

pub use activity::{EventKind, InboundEvent, Participant};
pub use controller::ConversationController;
pub use order::{Order, ROOT_DIALOG_ID, SLOT_DIALOG_ID, order_dialogs};
