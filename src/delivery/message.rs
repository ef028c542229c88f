//! Outbound payload types.

use crate::conversation::ConversationId;

/// How the text should be interpreted by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    #[default]
    Plain,
    Html,
}

/// Interactive controls attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReplyControls {
    #[default]
    None,
    /// Inline buttons answering question `key`; a press carries the option index.
    Choices { key: String, options: Vec<String> },
    /// Inline buttons carrying arbitrary callback data: `(label, data)`.
    Actions(Vec<(String, String)>),
    /// Persistent reply keyboard, one inner vec per row.
    Menu(Vec<Vec<String>>),
    RemoveKeyboard,
}

/// One message to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub controls: ReplyControls,
    pub parse_mode: ParseMode,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            controls: ReplyControls::None,
            parse_mode: ParseMode::Plain,
        }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self {
            parse_mode: ParseMode::Html,
            ..Self::text(text)
        }
    }

    pub fn with_controls(mut self, controls: ReplyControls) -> Self {
        self.controls = controls;
        self
    }
}

/// Reply to a button press. The platform expects it promptly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionAck {
    pub interaction_id: String,
    /// Optional toast shown to the user.
    pub text: Option<String>,
}

/// A queued send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryTask {
    pub conversation: ConversationId,
    pub message: OutboundMessage,
    /// Idempotency tag. A second task with the same tag inside the dedup
    /// window is dropped.
    pub tag: Option<String>,
}

impl DeliveryTask {
    pub fn new(conversation: ConversationId, message: OutboundMessage) -> Self {
        Self {
            conversation,
            message,
            tag: None,
        }
    }

    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Proof of a completed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Send attempts used, 1 when no rate limit was hit.
    pub attempts: u32,
    /// The task was a duplicate and was not sent.
    pub suppressed: bool,
}

/// Callback payload prefix of answer buttons.
pub const PICK_PREFIX: &str = "onb:pick:";

/// Callback payload for option `index` of question `key`.
pub fn pick_data(key: &str, index: usize) -> String {
    format!("{PICK_PREFIX}{key}:{index}")
}

/// Inverse of `pick_data`.
pub fn parse_pick(data: &str) -> Option<(&str, usize)> {
    let rest = data.strip_prefix(PICK_PREFIX)?;
    let (key, index) = rest.rsplit_once(':')?;
    Some((key, index.parse().ok()?))
}
