//! Outbound message queue — serialized, throttled delivery per conversation.
//!
//! Each conversation gets a lane: one send in flight, strict FIFO, a pause
//! after every successful send, and bounded backoff when the platform
//! reports throttling. A failed task is logged and the lane moves on.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::config::QueueConfig;
use crate::conversation::ConversationId;
use crate::error::{DeliveryError, TransportError};
use crate::lanes::{LaneHandler, Lanes};

use super::dedup::InteractionDeduper;
use super::message::{DeliveryReceipt, DeliveryTask, InteractionAck, OutboundMessage};
use super::transport::Transport;

type DeliveryResult = Result<DeliveryReceipt, DeliveryError>;

struct DeliveryJob {
    message: OutboundMessage,
    reply: oneshot::Sender<DeliveryResult>,
}

/// Retry and pacing knobs, copied out of `QueueConfig`.
#[derive(Debug, Clone, Copy)]
struct SendPolicy {
    min_interval: Duration,
    rate_limit_margin: Duration,
    max_attempts: u32,
}

/// Handle to a queued task. Dropping it does not cancel the send.
#[derive(Debug)]
pub struct PendingDelivery {
    conversation: ConversationId,
    state: PendingState,
}

#[derive(Debug)]
enum PendingState {
    Ready(DeliveryResult),
    Waiting(oneshot::Receiver<DeliveryResult>),
}

impl PendingDelivery {
    /// Wait for the task to be sent or to fail.
    pub async fn outcome(self) -> DeliveryResult {
        match self.state {
            PendingState::Ready(result) => result,
            PendingState::Waiting(rx) => rx
                .await
                .unwrap_or_else(|_| Err(DeliveryError::WorkerGone(self.conversation.to_string()))),
        }
    }
}

/// Central delivery point. All outbound traffic goes through here.
pub struct OutboundQueue {
    lanes: Lanes<ConversationId, DeliveryJob>,
    transport: Arc<dyn Transport>,
    interactions: InteractionDeduper,
    tags: InteractionDeduper,
}

impl OutboundQueue {
    pub fn new(transport: Arc<dyn Transport>, config: &QueueConfig) -> Self {
        let policy = SendPolicy {
            min_interval: config.min_interval,
            rate_limit_margin: config.rate_limit_margin,
            max_attempts: config.max_attempts.max(1),
        };

        let sender = Arc::clone(&transport);
        let handler: LaneHandler<ConversationId, DeliveryJob> = Arc::new(move |conversation, job| {
            let transport = Arc::clone(&sender);
            async move {
                let result = deliver(transport.as_ref(), policy, &conversation, &job.message).await;
                let delivered = result.is_ok();
                if let Err(e) = &result {
                    warn!(conversation = %conversation, error = %e, "Delivery failed");
                }
                // The caller may have dropped its handle.
                let _ = job.reply.send(result);
                if delivered {
                    tokio::time::sleep(policy.min_interval).await;
                }
            }
            .boxed()
        });

        Self {
            lanes: Lanes::new(config.lane_idle_timeout, handler),
            transport,
            interactions: InteractionDeduper::new(config.dedup_window),
            tags: InteractionDeduper::new(config.dedup_window),
        }
    }

    /// Queue a task behind everything already pending for its conversation.
    pub fn enqueue(&self, task: DeliveryTask) -> PendingDelivery {
        let DeliveryTask {
            conversation,
            message,
            tag,
        } = task;

        if let Some(tag) = &tag
            && self.tags.is_duplicate(&conversation, tag)
        {
            debug!(conversation = %conversation, tag = %tag, "Duplicate task suppressed");
            return PendingDelivery {
                conversation,
                state: PendingState::Ready(Ok(DeliveryReceipt {
                    attempts: 0,
                    suppressed: true,
                })),
            };
        }

        let (reply, rx) = oneshot::channel();
        self.lanes
            .submit(conversation.clone(), DeliveryJob { message, reply });
        PendingDelivery {
            conversation,
            state: PendingState::Waiting(rx),
        }
    }

    /// Convenience for `enqueue(DeliveryTask::new(..))`.
    pub fn send(&self, conversation: &ConversationId, message: OutboundMessage) -> PendingDelivery {
        self.enqueue(DeliveryTask::new(conversation.clone(), message))
    }

    /// Acknowledge a button press right away and report whether it repeats
    /// one seen within the dedup window. Duplicates are acknowledged too but
    /// must not be processed.
    pub async fn acknowledge_interaction(
        &self,
        conversation: &ConversationId,
        key: &str,
        ack: &InteractionAck,
    ) -> bool {
        let duplicate = self.interactions.is_duplicate(conversation, key);
        if duplicate {
            debug!(conversation = %conversation, key = %key, "Duplicate interaction");
        }
        if let Err(e) = self.transport.acknowledge(ack).await {
            warn!(conversation = %conversation, error = %e, "Interaction ack failed");
        }
        duplicate
    }
}

async fn deliver(
    transport: &dyn Transport,
    policy: SendPolicy,
    conversation: &ConversationId,
    message: &OutboundMessage,
) -> DeliveryResult {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match transport.send(conversation, message).await {
            Ok(()) => {
                return Ok(DeliveryReceipt {
                    attempts: attempt,
                    suppressed: false,
                });
            }
            Err(TransportError::RateLimited { retry_after }) => {
                let wait = retry_after + policy.rate_limit_margin;
                warn!(
                    conversation = %conversation,
                    attempt,
                    retry_after_ms = wait.as_millis() as u64,
                    "Rate limited, backing off"
                );
                // The throttle window holds the lane even when giving up.
                tokio::time::sleep(wait).await;
                if attempt >= policy.max_attempts {
                    return Err(DeliveryError::RateLimitExhausted { attempts: attempt });
                }
            }
            Err(TransportError::Failed(reason)) => {
                return Err(DeliveryError::Transport(reason));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::time::Instant;

    /// Replays scripted send results, then succeeds.
    #[derive(Default)]
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<(), TransportError>>>,
        sent: Mutex<Vec<(ConversationId, String, Instant)>>,
        acks: AtomicUsize,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
        send_delay: Duration,
    }

    impl ScriptedTransport {
        fn with_script(script: Vec<Result<(), TransportError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                ..Default::default()
            }
        }

        fn sent_texts(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|(_, t, _)| t.clone()).collect()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            conversation: &ConversationId,
            message: &OutboundMessage,
        ) -> Result<(), TransportError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.send_delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let next = self.script.lock().unwrap().pop_front().unwrap_or(Ok(()));
            self.sent
                .lock()
                .unwrap()
                .push((conversation.clone(), message.text.clone(), Instant::now()));
            next
        }

        async fn acknowledge(&self, _ack: &InteractionAck) -> Result<(), TransportError> {
            self.acks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn config() -> QueueConfig {
        QueueConfig {
            min_interval: Duration::from_millis(30),
            rate_limit_margin: Duration::from_millis(10),
            max_attempts: 3,
            dedup_window: Duration::from_millis(800),
            lane_idle_timeout: Duration::from_secs(5),
        }
    }

    fn limited(ms: u64) -> Result<(), TransportError> {
        Err(TransportError::RateLimited {
            retry_after: Duration::from_millis(ms),
        })
    }

    fn conv(id: &str) -> ConversationId {
        ConversationId::from(id)
    }

    #[tokio::test]
    async fn delivers_in_order_with_spacing() {
        let transport = Arc::new(ScriptedTransport::default());
        let queue = OutboundQueue::new(transport.clone(), &config());

        let handles: Vec<_> = (0..4)
            .map(|i| queue.send(&conv("1"), OutboundMessage::text(format!("m{i}"))))
            .collect();
        for handle in handles {
            assert_eq!(handle.outcome().await.unwrap().attempts, 1);
        }

        assert_eq!(transport.sent_texts(), vec!["m0", "m1", "m2", "m3"]);
        let sent = transport.sent.lock().unwrap();
        for pair in sent.windows(2) {
            assert!(pair[1].2 - pair[0].2 >= Duration::from_millis(30));
        }
    }

    #[tokio::test]
    async fn one_send_in_flight_per_conversation() {
        let transport = Arc::new(ScriptedTransport {
            send_delay: Duration::from_millis(10),
            ..Default::default()
        });
        let queue = OutboundQueue::new(transport.clone(), &config());

        let handles: Vec<_> = (0..3)
            .map(|i| queue.send(&conv("1"), OutboundMessage::text(i.to_string())))
            .collect();
        for handle in handles {
            handle.outcome().await.unwrap();
        }
        assert_eq!(transport.peak_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn conversations_do_not_block_each_other() {
        let transport = Arc::new(ScriptedTransport::with_script(vec![limited(300)]));
        let queue = OutboundQueue::new(transport.clone(), &config());

        let slow = queue.send(&conv("slow"), OutboundMessage::text("a"));
        // Let the slow lane consume the scripted rate limit first.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let fast = queue.send(&conv("fast"), OutboundMessage::text("b"));

        let started = Instant::now();
        fast.outcome().await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(250));
        assert_eq!(slow.outcome().await.unwrap().attempts, 2);
    }

    #[tokio::test]
    async fn rate_limit_waits_retry_after_plus_margin() {
        let transport = Arc::new(ScriptedTransport::with_script(vec![limited(50)]));
        let queue = OutboundQueue::new(transport.clone(), &config());

        let receipt = queue
            .send(&conv("1"), OutboundMessage::text("hello"))
            .outcome()
            .await
            .unwrap();
        assert_eq!(receipt.attempts, 2);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].2 - sent[0].2 >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn exhausted_retries_fail_and_lane_moves_on() {
        let transport = Arc::new(ScriptedTransport::with_script(vec![
            limited(5),
            limited(5),
            limited(5),
        ]));
        let queue = OutboundQueue::new(transport.clone(), &config());

        let first = queue.send(&conv("1"), OutboundMessage::text("first"));
        let second = queue.send(&conv("1"), OutboundMessage::text("second"));

        assert_eq!(
            first.outcome().await,
            Err(DeliveryError::RateLimitExhausted { attempts: 3 })
        );
        assert_eq!(second.outcome().await.unwrap().attempts, 1);
        assert_eq!(
            transport.sent_texts(),
            vec!["first", "first", "first", "second"]
        );
    }

    #[tokio::test]
    async fn exhausted_retries_still_wait_out_the_limit() {
        let transport = Arc::new(ScriptedTransport::with_script(vec![
            limited(100),
            limited(100),
            limited(100),
        ]));
        let queue = OutboundQueue::new(transport.clone(), &config());

        let first = queue.send(&conv("1"), OutboundMessage::text("first"));
        let second = queue.send(&conv("1"), OutboundMessage::text("second"));
        assert!(first.outcome().await.is_err());
        second.outcome().await.unwrap();

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 4);
        assert!(sent[3].2 - sent[2].2 >= Duration::from_millis(110));
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let transport = Arc::new(ScriptedTransport::with_script(vec![Err(
            TransportError::Failed("chat not found".into()),
        )]));
        let queue = OutboundQueue::new(transport.clone(), &config());

        let first = queue.send(&conv("1"), OutboundMessage::text("first"));
        let second = queue.send(&conv("1"), OutboundMessage::text("second"));

        assert!(matches!(
            first.outcome().await,
            Err(DeliveryError::Transport(_))
        ));
        second.outcome().await.unwrap();
        assert_eq!(transport.sent_texts(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn tagged_duplicate_is_not_sent() {
        let transport = Arc::new(ScriptedTransport::default());
        let queue = OutboundQueue::new(transport.clone(), &config());

        let task = DeliveryTask::new(conv("1"), OutboundMessage::text("plan")).tagged("plan:build");
        let first = queue.enqueue(task.clone()).outcome().await.unwrap();
        let second = queue.enqueue(task).outcome().await.unwrap();

        assert!(!first.suppressed);
        assert!(second.suppressed);
        assert_eq!(transport.sent_texts(), vec!["plan"]);
    }

    #[tokio::test]
    async fn duplicate_interactions_are_acked_but_flagged() {
        let transport = Arc::new(ScriptedTransport::default());
        let queue = OutboundQueue::new(transport.clone(), &config());
        let ack = InteractionAck {
            interaction_id: "cb1".into(),
            text: None,
        };

        assert!(!queue.acknowledge_interaction(&conv("1"), "onb:pick:sex:0", &ack).await);
        assert!(queue.acknowledge_interaction(&conv("1"), "onb:pick:sex:0", &ack).await);
        assert_eq!(transport.acks.load(Ordering::SeqCst), 2);
        assert!(transport.sent_texts().is_empty());
    }
}
