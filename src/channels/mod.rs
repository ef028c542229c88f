//! Channel abstraction for message I/O.
//!
//! A channel produces inbound events; the same type implements
//! `delivery::Transport` for the outbound side.

pub mod channel;
pub mod cli;
pub mod telegram;

pub use channel::*;
pub use cli::CliChannel;
pub use telegram::TelegramChannel;
