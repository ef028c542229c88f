//! Fit Coach — conversational onboarding and plan building for a fitness
//! coaching bot.

pub mod channels;
pub mod coach;
pub mod config;
pub mod conversation;
pub mod delivery;
pub mod error;
pub mod lanes;
pub mod llm;
pub mod onboarding;
pub mod plan;
pub mod store;

pub use conversation::ConversationId;
pub use error::{Error, Result};
