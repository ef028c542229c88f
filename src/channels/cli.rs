//! CLI channel — stdin/stdout REPL for local testing.
//!
//! Buttons are printed as a numbered list; typing a number presses the
//! matching button of the most recent message that had any.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use crate::channels::{Channel, EventStream, InboundEvent};
use crate::conversation::ConversationId;
use crate::delivery::{InteractionAck, OutboundMessage, ReplyControls, Transport, pick_data};
use crate::error::{ChannelError, TransportError};

/// Conversation id used for the single local session.
pub const CLI_CONVERSATION: &str = "cli";

/// A simple CLI channel that reads from stdin and writes to stdout.
#[derive(Default)]
pub struct CliChannel {
    /// Callback payloads of the last printed buttons, in display order.
    buttons: Arc<Mutex<Vec<String>>>,
}

impl CliChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn remember(&self, controls: &ReplyControls) {
        let data = match controls {
            ReplyControls::Choices { key, options } => {
                (0..options.len()).map(|i| pick_data(key, i)).collect()
            }
            ReplyControls::Actions(actions) => actions.iter().map(|(_, d)| d.clone()).collect(),
            _ => return,
        };
        *self.buttons.lock().unwrap_or_else(PoisonError::into_inner) = data;
    }
}

/// Turn one typed line into an event.
fn line_to_event(line: &str, buttons: &Mutex<Vec<String>>) -> InboundEvent {
    let pressed = line.parse::<usize>().ok().and_then(|n| {
        let buttons = buttons.lock().unwrap_or_else(PoisonError::into_inner);
        n.checked_sub(1).and_then(|i| buttons.get(i).cloned())
    });

    match pressed {
        Some(data) => InboundEvent::interaction(
            CLI_CONVERSATION,
            "local-user",
            Uuid::new_v4().to_string(),
            data,
        ),
        None => InboundEvent::text(CLI_CONVERSATION, "local-user", line),
    }
}

fn render(message: &OutboundMessage) -> String {
    let mut out = message.text.clone();
    let labels: Vec<&str> = match &message.controls {
        ReplyControls::Choices { options, .. } => options.iter().map(String::as_str).collect(),
        ReplyControls::Actions(actions) => actions.iter().map(|(l, _)| l.as_str()).collect(),
        ReplyControls::Menu(rows) => {
            let menu: Vec<&str> = rows.iter().flatten().map(String::as_str).collect();
            out.push_str(&format!("\n[{}]", menu.join(" | ")));
            Vec::new()
        }
        _ => Vec::new(),
    };
    for (i, label) in labels.iter().enumerate() {
        out.push_str(&format!("\n  {}. {label}", i + 1));
    }
    out
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let buttons = Arc::clone(&self.buttons);

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            // Print prompt
            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        if tx.send(line_to_event(&line, &buttons)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl Transport for CliChannel {
    async fn send(
        &self,
        _conversation: &ConversationId,
        message: &OutboundMessage,
    ) -> Result<(), TransportError> {
        self.remember(&message.controls);
        println!("\n{}\n", render(message));
        eprint!("> ");
        Ok(())
    }

    async fn acknowledge(&self, ack: &InteractionAck) -> Result<(), TransportError> {
        if let Some(text) = &ack.text {
            eprintln!("ℹ️  {text}");
        }
        Ok(())
    }
}
