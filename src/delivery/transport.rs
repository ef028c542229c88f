//! Transport trait — the platform-facing send side of a channel.

use async_trait::async_trait;

use crate::conversation::ConversationId;
use crate::error::TransportError;

use super::message::{InteractionAck, OutboundMessage};

/// Sends messages to one messaging platform.
///
/// Implementations report platform throttling as
/// `TransportError::RateLimited` so the queue can back off; they never retry
/// on their own.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        conversation: &ConversationId,
        message: &OutboundMessage,
    ) -> Result<(), TransportError>;

    async fn acknowledge(&self, ack: &InteractionAck) -> Result<(), TransportError>;
}
