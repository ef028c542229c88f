//! In-memory store backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::conversation::ConversationId;
use crate::error::StoreError;
use crate::onboarding::model::CoachProfile;
use crate::onboarding::state::OnboardingSession;

use super::traits::{ProfileStore, SessionStore};

/// Process-lifetime storage for sessions and profiles.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<ConversationId, OnboardingSession>>,
    profiles: RwLock<HashMap<ConversationId, CoachProfile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open interview sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(
        &self,
        conversation: &ConversationId,
    ) -> Result<Option<OnboardingSession>, StoreError> {
        Ok(self.sessions.read().await.get(conversation).cloned())
    }

    async fn create(
        &self,
        conversation: &ConversationId,
        session: OnboardingSession,
    ) -> Result<bool, StoreError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(conversation) {
            return Ok(false);
        }
        sessions.insert(conversation.clone(), session);
        Ok(true)
    }

    async fn update(
        &self,
        conversation: &ConversationId,
        session: OnboardingSession,
    ) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(conversation.clone(), session);
        Ok(())
    }

    async fn delete(&self, conversation: &ConversationId) -> Result<bool, StoreError> {
        Ok(self.sessions.write().await.remove(conversation).is_some())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(
        &self,
        conversation: &ConversationId,
    ) -> Result<Option<CoachProfile>, StoreError> {
        Ok(self.profiles.read().await.get(conversation).cloned())
    }

    async fn put_profile(
        &self,
        conversation: &ConversationId,
        profile: CoachProfile,
    ) -> Result<(), StoreError> {
        self.profiles
            .write()
            .await
            .insert(conversation.clone(), profile);
        Ok(())
    }
}
