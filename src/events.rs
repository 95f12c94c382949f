//! Message lifecycle events, independent of the gateway library that
//! produced them.

use crate::model::{MessageAttachment, MessageReaction};
use chrono::{DateTime, Utc};

/// Snapshot of a message as delivered by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    pub message_id: String,
    pub channel_id: String,
    pub channel_name: String,
    pub guild_id: Option<String>,
    pub guild_name: Option<String>,
    pub author_id: String,
    pub author_name: String,
    pub author_discriminator: String,
    pub author_is_bot: bool,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub attachments: Vec<MessageAttachment>,
    pub embeds: Vec<IncomingEmbed>,
    pub reactions: Vec<MessageReaction>,
    /// Type label as reported by the gateway, stored verbatim.
    pub kind: String,
    /// Posted through a webhook rather than by a user or bot account.
    pub from_webhook: bool,
    /// Generated by Discord itself (joins, pins, boosts, ...).
    pub system: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IncomingEmbed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub color: Option<u32>,
    pub timestamp: Option<DateTime<Utc>>,
    pub footer_text: Option<String>,
    pub author_name: Option<String>,
    pub fields: Vec<IncomingEmbedField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncomingEmbedField {
    pub name: Option<String>,
    pub value: Option<String>,
    pub inline: bool,
}

impl IncomingMessage {
    /// Webhook posts and system messages are never logged.
    pub fn is_eligible(&self) -> bool {
        !self.from_webhook && !self.system
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageEvent {
    Created(IncomingMessage),
    Updated(IncomingMessage),
    Deleted {
        message_id: String,
        channel_id: String,
    },
}

impl MessageEvent {
    pub fn message_id(&self) -> &str {
        match self {
            Self::Created(m) | Self::Updated(m) => &m.message_id,
            Self::Deleted { message_id, .. } => message_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created(_) => "create",
            Self::Updated(_) => "update",
            Self::Deleted { .. } => "delete",
        }
    }
}
