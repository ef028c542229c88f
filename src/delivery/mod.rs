//! Outbound delivery — transport abstraction, per-conversation queue and
//! interaction dedup.

pub mod dedup;
pub mod message;
pub mod queue;
pub mod transport;

pub use dedup::InteractionDeduper;
pub use message::{
    DeliveryReceipt, DeliveryTask, InteractionAck, OutboundMessage, ParseMode, ReplyControls,
    parse_pick, pick_data,
};
pub use queue::{OutboundQueue, PendingDelivery};
pub use transport::Transport;
