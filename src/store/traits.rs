//! Store traits — async, backend-agnostic persistence keyed by conversation.
//!
//! The in-memory backend keeps everything for the process lifetime; a durable
//! backend only has to implement these two traits.

use async_trait::async_trait;

use crate::conversation::ConversationId;
use crate::error::StoreError;
use crate::onboarding::model::CoachProfile;
use crate::onboarding::state::OnboardingSession;

/// Live interview sessions, at most one per conversation.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the session for a conversation.
    async fn get(&self, conversation: &ConversationId)
    -> Result<Option<OnboardingSession>, StoreError>;

    /// Insert a session if none exists. Returns `false` and leaves the
    /// existing session untouched otherwise.
    async fn create(
        &self,
        conversation: &ConversationId,
        session: OnboardingSession,
    ) -> Result<bool, StoreError>;

    /// Replace an existing session.
    async fn update(
        &self,
        conversation: &ConversationId,
        session: OnboardingSession,
    ) -> Result<(), StoreError>;

    /// Remove a session. Returns whether one existed.
    async fn delete(&self, conversation: &ConversationId) -> Result<bool, StoreError>;
}

/// Everything kept about a user after onboarding.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(
        &self,
        conversation: &ConversationId,
    ) -> Result<Option<CoachProfile>, StoreError>;

    async fn put_profile(
        &self,
        conversation: &ConversationId,
        profile: CoachProfile,
    ) -> Result<(), StoreError>;
}
