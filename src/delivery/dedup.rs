//! Duplicate interaction suppression.
//!
//! Platforms redeliver button presses and users double-tap. A press whose
//! (conversation, key) pair was seen within the window is a duplicate.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::conversation::ConversationId;

/// Entries beyond this count trigger a sweep of expired ones.
const PRUNE_THRESHOLD: usize = 1024;

pub struct InteractionDeduper {
    window: Duration,
    seen: Mutex<HashMap<(ConversationId, String), Instant>>,
}

impl InteractionDeduper {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Record the interaction and report whether it repeats one seen
    /// within the window.
    pub fn is_duplicate(&self, conversation: &ConversationId, key: &str) -> bool {
        self.check_at(conversation, key, Instant::now())
    }

    pub fn check_at(&self, conversation: &ConversationId, key: &str, now: Instant) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);

        if seen.len() > PRUNE_THRESHOLD {
            let window = self.window;
            seen.retain(|_, at| now.saturating_duration_since(*at) < window);
        }

        let previous = seen.insert((conversation.clone(), key.to_string()), now);
        previous.is_some_and(|at| now.saturating_duration_since(at) < self.window)
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
