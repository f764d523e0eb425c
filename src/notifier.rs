use std::collections::HashSet;

use tracing::{debug, error, info};

use crate::platform::{ChatGateway, IncomingMessage, Presence, ReadyInfo};
use crate::template::{MessageData, Template};

/// Why a message did or did not produce a notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// The notice was sent and the guild is now marked as notified
    Notified,
    IgnoredBot,
    IgnoredNoPrefix,
    IgnoredAlreadyNotified,
    IgnoredNotCommand,
    /// Sending failed; the guild stays eligible
    SendFailed,
}

/// Sends the maintenance notice at most once per guild.
///
/// Owned by a single event consumer, so the notified set needs no lock.
pub struct Notifier {
    template: Template,
    prefix: Option<String>,
    discord_server: String,
    identity: String,
    notified: HashSet<String>,
}

impl Notifier {
    pub fn new(template: Template, prefix: Option<String>, discord_server: String) -> Self {
        Self {
            template,
            prefix,
            discord_server,
            identity: String::new(),
            notified: HashSet::new(),
        }
    }

    /// Bot identity captured from the last ready event, empty before that.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn is_notified(&self, group_id: &str) -> bool {
        self.notified.contains(group_id)
    }

    pub fn notified_count(&self) -> usize {
        self.notified.len()
    }

    pub async fn on_ready(&mut self, ready: &ReadyInfo, gateway: &dyn ChatGateway) {
        debug!("Using Discord gateway v{}", ready.gateway_version);
        info!(
            "Successfully connected to Discord as {} ({})",
            ready.identity, ready.user_id
        );

        self.identity = ready.identity.clone();

        if let Err(e) = gateway.set_presence(&Presence::maintenance()).await {
            error!("Unable to set presence: {:#}", e);
        }
    }

    pub async fn on_message(
        &mut self,
        message: &IncomingMessage,
        gateway: &dyn ChatGateway,
    ) -> MessageOutcome {
        if message.author_is_bot {
            return MessageOutcome::IgnoredBot;
        }

        let Some(prefix) = self.prefix.as_deref() else {
            return MessageOutcome::IgnoredNoPrefix;
        };

        if self.is_notified(&message.group_id) {
            return MessageOutcome::IgnoredAlreadyNotified;
        }

        if !message.content.starts_with(prefix) {
            return MessageOutcome::IgnoredNotCommand;
        }

        let text = self.render();

        if let Err(e) = gateway.send_message(&message.channel_id, &text).await {
            error!(
                "Unable to send the notice in channel {}: {:#}",
                message.channel_id, e
            );
            return MessageOutcome::SendFailed;
        }

        info!(
            "Sent maintenance notice to guild {} (channel {})",
            message.group_id, message.channel_id
        );
        self.notified.insert(message.group_id.clone());
        MessageOutcome::Notified
    }

    /// Render the notice with surrounding spaces stripped.
    pub fn render(&self) -> String {
        let rendered = self.template.render(&MessageData {
            bot: &self.identity,
            discord_server: &self.discord_server,
        });
        rendered.trim_matches(' ').to_string()
    }
}
