//! Persistence layer — per-conversation sessions and profiles.

pub mod memory;
pub mod traits;

pub use memory::MemoryStore;
pub use traits::{ProfileStore, SessionStore};
