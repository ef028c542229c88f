//! Channel trait and inbound event types.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::conversation::ConversationId;
use crate::error::ChannelError;

/// What the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A typed message.
    Text(String),
    /// A button press. `data` is the callback payload attached to the button.
    Interaction { interaction_id: String, data: String },
}

/// One event from a messaging platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub conversation: ConversationId,
    /// Platform user id or username.
    pub user: String,
    pub kind: EventKind,
}

impl InboundEvent {
    pub fn text(conversation: impl Into<ConversationId>, user: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            conversation: conversation.into(),
            user: user.into(),
            kind: EventKind::Text(text.into()),
        }
    }

    pub fn interaction(
        conversation: impl Into<ConversationId>,
        user: impl Into<String>,
        interaction_id: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            conversation: conversation.into(),
            user: user.into(),
            kind: EventKind::Interaction {
                interaction_id: interaction_id.into(),
                data: data.into(),
            },
        }
    }
}

pub type EventStream = Pin<Box<dyn Stream<Item = InboundEvent> + Send>>;

/// Receive side of a messaging platform.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Begin receiving events.
    async fn start(&self) -> Result<EventStream, ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
