//! Gloves Bot — a slot-filling dialog engine and the order bot built on it.

pub mod bot;
pub mod channels;
pub mod config;
pub mod dialogs;
pub mod error;
pub mod store;
