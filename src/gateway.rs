//! Translates serenity gateway events into [`MessageEvent`]s.

use crate::events::{IncomingEmbed, IncomingEmbedField, IncomingMessage, MessageEvent};
use crate::listener::EventSender;
use crate::model::{MessageAttachment, MessageReaction};
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use poise::serenity_prelude::{FullEvent, Message, MessageType, ReactionType, Timestamp};
use tracing::{debug, warn};

/// Forwards message lifecycle events to the listener queue. Everything else
/// is ignored.
pub async fn forward_event(ctx: &serenity::Context, event: &FullEvent, events: &EventSender) {
    match event {
        FullEvent::Message { new_message } => {
            let incoming = incoming_message(ctx, new_message).await;
            events.send(MessageEvent::Created(incoming)).await;
        }
        FullEvent::MessageUpdate { new, event, .. } => {
            // Only cached messages arrive complete; fetch the rest
            let message = match new {
                Some(message) => message.clone(),
                None => match event.channel_id.message(ctx, event.id).await {
                    Ok(message) => message,
                    Err(e) => {
                        warn!(
                            "Gateway: Could not fetch updated message {} in channel {}: {}",
                            event.id, event.channel_id, e
                        );
                        return;
                    }
                },
            };
            let incoming = incoming_message(ctx, &message).await;
            events.send(MessageEvent::Updated(incoming)).await;
        }
        FullEvent::MessageDelete {
            channel_id,
            deleted_message_id,
            ..
        } => {
            events
                .send(MessageEvent::Deleted {
                    message_id: deleted_message_id.to_string(),
                    channel_id: channel_id.to_string(),
                })
                .await;
        }
        FullEvent::MessageDeleteBulk {
            channel_id,
            multiple_deleted_messages_ids,
            ..
        } => {
            debug!(
                "Gateway: Bulk delete of {} messages in channel {}",
                multiple_deleted_messages_ids.len(),
                channel_id
            );
            for message_id in multiple_deleted_messages_ids {
                events
                    .send(MessageEvent::Deleted {
                        message_id: message_id.to_string(),
                        channel_id: channel_id.to_string(),
                    })
                    .await;
            }
        }
        _ => {}
    }
}

async fn incoming_message(ctx: &serenity::Context, msg: &Message) -> IncomingMessage {
    let channel_name = msg
        .channel_id
        .name(ctx)
        .await
        .unwrap_or_else(|_| msg.channel_id.to_string());
    let guild_name = msg.guild_id.and_then(|id| id.name(ctx));

    IncomingMessage {
        message_id: msg.id.to_string(),
        channel_id: msg.channel_id.to_string(),
        channel_name,
        guild_id: msg.guild_id.map(|id| id.to_string()),
        guild_name,
        author_id: msg.author.id.to_string(),
        author_name: msg.author.name.clone(),
        author_discriminator: msg
            .author
            .discriminator
            .map(|d| format!("{:04}", d.get()))
            .unwrap_or_else(|| "0000".to_string()),
        author_is_bot: msg.author.bot,
        content: msg.content.clone(),
        created_at: utc(&msg.timestamp),
        edited_at: msg.edited_timestamp.as_ref().map(utc),
        attachments: msg
            .attachments
            .iter()
            .map(|a| MessageAttachment {
                id: a.id.to_string(),
                filename: a.filename.clone(),
                url: a.url.clone(),
                proxy_url: a.proxy_url.clone(),
                size: u64::from(a.size),
                content_type: a.content_type.clone(),
            })
            .collect(),
        embeds: msg
            .embeds
            .iter()
            .map(|e| IncomingEmbed {
                title: e.title.clone(),
                description: e.description.clone(),
                url: e.url.clone(),
                color: e.colour.map(|c| c.0),
                timestamp: e.timestamp.as_ref().map(utc),
                footer_text: e.footer.as_ref().map(|f| f.text.clone()),
                author_name: e.author.as_ref().map(|a| a.name.clone()),
                fields: e
                    .fields
                    .iter()
                    .map(|f| IncomingEmbedField {
                        name: Some(f.name.clone()),
                        value: Some(f.value.clone()),
                        inline: f.inline,
                    })
                    .collect(),
            })
            .collect(),
        reactions: msg
            .reactions
            .iter()
            .map(|r| MessageReaction {
                emoji: emoji_label(&r.reaction_type),
                count: r.count,
            })
            .collect(),
        kind: format!("{:?}", msg.kind),
        from_webhook: msg.webhook_id.is_some(),
        system: is_system_kind(msg.kind),
    }
}

fn utc(ts: &Timestamp) -> DateTime<Utc> {
    **ts
}

fn emoji_label(reaction: &ReactionType) -> String {
    match reaction {
        ReactionType::Unicode(emoji) => emoji.clone(),
        ReactionType::Custom { id, name, .. } => name.clone().unwrap_or_else(|| id.to_string()),
        other => other.to_string(),
    }
}

/// Types produced by Discord rather than written by a participant.
pub fn is_system_kind(kind: MessageType) -> bool {
    !matches!(
        kind,
        MessageType::Regular
            | MessageType::InlineReply
            | MessageType::ChatInputCommand
            | MessageType::ContextMenuCommand
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_kinds() {
        assert!(!is_system_kind(MessageType::Regular));
        assert!(!is_system_kind(MessageType::InlineReply));
        assert!(!is_system_kind(MessageType::ChatInputCommand));
        assert!(is_system_kind(MessageType::PinsAdd));
        assert!(is_system_kind(MessageType::MemberJoin));
    }

    #[test]
    fn test_emoji_label() {
        assert_eq!(emoji_label(&ReactionType::Unicode("👍".to_string())), "👍");
        let custom = ReactionType::Custom {
            animated: false,
            id: serenity::EmojiId::new(42),
            name: Some("party".to_string()),
        };
        assert_eq!(emoji_label(&custom), "party");
    }
}
