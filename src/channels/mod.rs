//! Channel abstraction for message I/O.

pub mod channel;
pub mod cli;
pub mod http;
pub mod transcript;

pub use channel::*;
pub use cli::CliChannel;
pub use http::message_routes;
pub use transcript::{Delivered, Transcript};
