//! OnboardingManager — coordinates interview sessions against the session
//! store.
//!
//! Every mutation loads the session, applies it, and writes it back. Callers
//! serialize work per conversation, so there is no read-modify-write race.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::conversation::ConversationId;
use crate::error::{SessionError, ValidationError};
use crate::store::SessionStore;

use super::graph::QuestionGraph;
use super::question::{QuestionDefinition, RawInput};
use super::state::{OnboardingSession, Step};

/// Outcome of handing a reply to the active session.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Accepted(Step),
    /// The reply failed validation. The session still waits on `question`.
    Rejected {
        error: ValidationError,
        question: QuestionDefinition,
    },
}

/// Drives interviews for all conversations.
pub struct OnboardingManager {
    graph: Arc<QuestionGraph>,
    store: Arc<dyn SessionStore>,
}

impl OnboardingManager {
    pub fn new(graph: Arc<QuestionGraph>, store: Arc<dyn SessionStore>) -> Self {
        Self { graph, store }
    }

    pub fn graph(&self) -> &QuestionGraph {
        &self.graph
    }

    /// Open an interview. Fails if one is already running; its progress is
    /// left as is.
    pub async fn start(&self, conversation: &ConversationId) -> Result<Step, SessionError> {
        let (session, step) = OnboardingSession::begin(&self.graph, Utc::now());

        if matches!(step, Step::Finished(_)) {
            if self.store.get(conversation).await?.is_some() {
                return Err(SessionError::AlreadyInProgress(conversation.to_string()));
            }
            return Ok(step);
        }

        if !self.store.create(conversation, session).await? {
            return Err(SessionError::AlreadyInProgress(conversation.to_string()));
        }

        info!(conversation = %conversation, "Onboarding started");
        Ok(step)
    }

    /// Validate a free-text or structured reply to the current question.
    pub async fn submit_answer(
        &self,
        conversation: &ConversationId,
        input: RawInput,
    ) -> Result<Submission, SessionError> {
        let mut session = self.load(conversation).await?;

        match session.submit(&self.graph, &input) {
            Ok(step) => {
                self.persist(conversation, session, &step).await?;
                Ok(Submission::Accepted(step))
            }
            Err(error) => {
                let question = session
                    .current(&self.graph)
                    .cloned()
                    .ok_or_else(|| SessionError::NoActiveSession(conversation.to_string()))?;
                debug!(
                    conversation = %conversation,
                    key = %question.key,
                    error = %error,
                    "Answer rejected"
                );
                Ok(Submission::Rejected { error, question })
            }
        }
    }

    /// Handle a button press for option `index` of question `key`.
    ///
    /// Presses for any question other than the current one are stale.
    pub async fn submit_selection(
        &self,
        conversation: &ConversationId,
        key: &str,
        index: usize,
    ) -> Result<Submission, SessionError> {
        let session = self.load(conversation).await?;
        let question = session
            .current(&self.graph)
            .ok_or_else(|| SessionError::NoActiveSession(conversation.to_string()))?;

        if question.key != key {
            return Err(SessionError::StaleSelection {
                key: key.to_string(),
            });
        }

        let Some(option) = question.options().get(index).cloned() else {
            return Ok(Submission::Rejected {
                error: ValidationError::NotAnOption,
                question: question.clone(),
            });
        };

        self.submit_answer(conversation, RawInput::Selection(option))
            .await
    }

    /// Drop the interview. Returns whether one was running.
    pub async fn cancel(&self, conversation: &ConversationId) -> Result<bool, SessionError> {
        let existed = self.store.delete(conversation).await?;
        if existed {
            info!(conversation = %conversation, "Onboarding cancelled");
        }
        Ok(existed)
    }

    /// The question the interview is waiting on, if one is running.
    pub async fn current_question(
        &self,
        conversation: &ConversationId,
    ) -> Result<Option<QuestionDefinition>, SessionError> {
        Ok(self
            .store
            .get(conversation)
            .await?
            .and_then(|s| s.current(&self.graph).cloned()))
    }

    pub async fn is_active(&self, conversation: &ConversationId) -> Result<bool, SessionError> {
        Ok(self.store.get(conversation).await?.is_some())
    }

    /// Snapshot of a running session.
    pub async fn session(
        &self,
        conversation: &ConversationId,
    ) -> Result<Option<OnboardingSession>, SessionError> {
        Ok(self.store.get(conversation).await?)
    }

    async fn load(&self, conversation: &ConversationId) -> Result<OnboardingSession, SessionError> {
        self.store
            .get(conversation)
            .await?
            .ok_or_else(|| SessionError::NoActiveSession(conversation.to_string()))
    }

    async fn persist(
        &self,
        conversation: &ConversationId,
        session: OnboardingSession,
        step: &Step,
    ) -> Result<(), SessionError> {
        match step {
            Step::Finished(answers) => {
                self.store.delete(conversation).await?;
                info!(
                    conversation = %conversation,
                    answers = answers.len(),
                    "Onboarding completed"
                );
            }
            Step::NextQuestion(_) => self.store.update(conversation, session).await?,
        }
        Ok(())
    }
}
