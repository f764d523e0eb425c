use std::future::Future;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serenity::all::{
    ActivityData, ChannelId, Client, Context, EventHandler, GatewayIntents, Message,
    OnlineStatus, Ready,
};
use serenity::gateway::ShardMessenger;
use serenity::http::Http;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use super::{ChatGateway, GatewayEvent, IncomingMessage, Presence, ReadyInfo, Status};

/// Guild messages only; content is needed to see the prefix.
fn intents() -> GatewayIntents {
    GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
}

/// Forwards serenity callbacks onto the event queue.
struct Handler {
    events: mpsc::UnboundedSender<GatewayEvent>,
    shard: Arc<RwLock<Option<ShardMessenger>>>,
}

impl Handler {
    fn forward(&self, event: GatewayEvent) {
        if self.events.send(event).is_err() {
            warn!("Event consumer has stopped; dropping gateway event");
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        *self.shard.write().await = Some(ctx.shard.clone());

        self.forward(GatewayEvent::Ready(ReadyInfo {
            // `name#1234`, or plain `name` for accounts migrated off discriminators
            identity: ready.user.tag(),
            user_id: ready.user.id.to_string(),
            gateway_version: ready.version,
        }));
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        // DMs are not subscribed to, but be safe
        let Some(guild_id) = msg.guild_id else {
            debug!("Ignoring message {} without a guild", msg.id);
            return;
        };

        self.forward(GatewayEvent::Message(IncomingMessage {
            group_id: guild_id.to_string(),
            channel_id: msg.channel_id.to_string(),
            author_is_bot: msg.author.bot,
            content: msg.content,
        }));
    }
}

/// Outbound Discord calls: REST for messages, the shard for presence.
pub struct DiscordGateway {
    http: Arc<Http>,
    shard: Arc<RwLock<Option<ShardMessenger>>>,
}

fn online_status(status: Status) -> OnlineStatus {
    match status {
        Status::DoNotDisturb => OnlineStatus::DoNotDisturb,
    }
}

#[async_trait]
impl ChatGateway for DiscordGateway {
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<()> {
        let id: u64 = channel_id
            .parse()
            .with_context(|| format!("Invalid channel id: {}", channel_id))?;
        if id == 0 {
            anyhow::bail!("Invalid channel id: 0");
        }

        ChannelId::new(id)
            .say(&self.http, text)
            .await
            .with_context(|| format!("Failed to send message to channel {}", channel_id))?;
        Ok(())
    }

    async fn set_presence(&self, presence: &Presence) -> Result<()> {
        let shard = self.shard.read().await;
        let shard = shard
            .as_ref()
            .context("Gateway shard is not connected yet")?;

        shard.set_presence(
            Some(ActivityData::watching(presence.watching.clone())),
            online_status(presence.status),
        );
        Ok(())
    }
}

/// An authenticated, not yet started, Discord client.
pub struct DiscordConnection {
    client: Client,
    gateway: Arc<DiscordGateway>,
}

impl DiscordConnection {
    pub async fn connect(token: &str, events: mpsc::UnboundedSender<GatewayEvent>) -> Result<Self> {
        let shard = Arc::new(RwLock::new(None));
        let handler = Handler {
            events,
            shard: shard.clone(),
        };

        let client = Client::builder(token, intents())
            .event_handler(handler)
            .await
            .context("Unable to create a Discord client")?;

        let gateway = Arc::new(DiscordGateway {
            http: client.http.clone(),
            shard,
        });

        Ok(Self { client, gateway })
    }

    pub fn gateway(&self) -> Arc<DiscordGateway> {
        self.gateway.clone()
    }

    /// Open the gateway connection and keep it until `shutdown` resolves,
    /// then close it. Failing to open or close the connection is an error.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let shard_manager = self.client.shard_manager.clone();
        let mut client = self.client;
        let mut task = tokio::spawn(async move { client.start().await });

        info!("Opening gateway connection...");

        tokio::select! {
            result = &mut task => {
                result
                    .context("Discord client task panicked")?
                    .context("Unable to open a gateway connection")?;
                anyhow::bail!("Gateway connection closed unexpectedly");
            }
            _ = shutdown => {
                warn!("We are now closing the connection...");
                shard_manager.shutdown_all().await;
                task.await
                    .context("Discord client task panicked")?
                    .context("Unable to close the gateway connection")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intents_are_guild_messages_only() {
        let intents = intents();
        assert!(intents.contains(GatewayIntents::GUILD_MESSAGES));
        assert!(!intents.contains(GatewayIntents::DIRECT_MESSAGES));
        assert!(!intents.contains(GatewayIntents::GUILD_MEMBERS));
    }

    #[test]
    fn test_maintenance_presence_is_dnd() {
        assert_eq!(
            online_status(Presence::maintenance().status),
            OnlineStatus::DoNotDisturb
        );
    }

    fn offline_gateway() -> DiscordGateway {
        DiscordGateway {
            http: Arc::new(Http::new("")),
            shard: Arc::new(RwLock::new(None)),
        }
    }

    #[tokio::test]
    async fn test_invalid_channel_ids_rejected() {
        let gateway = offline_gateway();
        assert!(gateway.send_message("abc", "hello").await.is_err());
        assert!(gateway.send_message("0", "hello").await.is_err());
        assert!(gateway.send_message("", "hello").await.is_err());
    }

    #[tokio::test]
    async fn test_presence_before_ready_is_error() {
        let gateway = offline_gateway();
        assert!(gateway.set_presence(&Presence::maintenance()).await.is_err());
    }
}
