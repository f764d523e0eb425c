pub mod discord;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::notifier::Notifier;

/// A message received from the gateway
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Guild the message was posted in
    pub group_id: String,
    /// Channel to answer in
    pub channel_id: String,
    pub author_is_bot: bool,
    /// The message text
    pub content: String,
}

/// What the gateway reports once the session is established
#[derive(Debug, Clone)]
pub struct ReadyInfo {
    /// `username#discriminator`, or just the username
    pub identity: String,
    pub user_id: String,
    pub gateway_version: u8,
}

#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Ready(ReadyInfo),
    Message(IncomingMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    DoNotDisturb,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presence {
    pub status: Status,
    /// Shown as "Watching <text>"
    pub watching: String,
}

impl Presence {
    pub fn maintenance() -> Self {
        Self {
            status: Status::DoNotDisturb,
            watching: "the servers go whirrrr...".to_string(),
        }
    }
}

/// Outbound side of the gateway connection.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<()>;

    async fn set_presence(&self, presence: &Presence) -> Result<()>;
}

/// Apply gateway events to the notifier one at a time, until every sender
/// has been dropped.
pub async fn run_event_loop(
    mut notifier: Notifier,
    mut events: mpsc::UnboundedReceiver<GatewayEvent>,
    gateway: &dyn ChatGateway,
) -> Notifier {
    info!("Event loop started");

    while let Some(event) = events.recv().await {
        match event {
            GatewayEvent::Ready(ready) => notifier.on_ready(&ready, gateway).await,
            GatewayEvent::Message(message) => {
                let outcome = notifier.on_message(&message, gateway).await;
                debug!(
                    "Message in guild {} channel {}: {:?}",
                    message.group_id, message.channel_id, outcome
                );
            }
        }
    }

    info!(
        "Event loop stopped; {} notified {} guild(s)",
        notifier.identity(),
        notifier.notified_count()
    );
    notifier
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use tokio::sync::Mutex;

    /// In-memory gateway that records outbound calls.
    #[derive(Default)]
    pub struct FakeGateway {
        pub sent: Mutex<Vec<(String, String)>>,
        pub presences: Mutex<Vec<Presence>>,
        /// Number of upcoming sends that should fail
        pub fail_sends: Mutex<usize>,
        pub fail_presence: bool,
    }

    impl FakeGateway {
        pub fn failing_presence() -> Self {
            Self {
                fail_presence: true,
                ..Default::default()
            }
        }

        pub async fn fail_next_sends(&self, count: usize) {
            *self.fail_sends.lock().await = count;
        }

        pub async fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().await.clone()
        }
    }

    #[async_trait]
    impl ChatGateway for FakeGateway {
        async fn send_message(&self, channel_id: &str, text: &str) -> Result<()> {
            let mut remaining = self.fail_sends.lock().await;
            if *remaining > 0 {
                *remaining -= 1;
                anyhow::bail!("Missing Permissions");
            }
            self.sent
                .lock()
                .await
                .push((channel_id.to_string(), text.to_string()));
            Ok(())
        }

        async fn set_presence(&self, presence: &Presence) -> Result<()> {
            if self.fail_presence {
                anyhow::bail!("shard is not connected");
            }
            self.presences.lock().await.push(presence.clone());
            Ok(())
        }
    }
}
