use crate::db::{MessageRepository, Page, PageRequest, StoreError};
use crate::events::{IncomingEmbed, IncomingMessage};
use crate::model::{EmbedField, LoggedMessage, MessageEmbed};
use chrono::{DateTime, Local, NaiveDateTime, SubsecRound, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStats {
    pub channel_id: String,
    pub total_messages: u64,
}

/// Keeps the message store in step with the gateway's lifecycle events.
///
/// Write operations never return errors: failures are logged with the
/// message id and reported as `None` / `false`.
#[derive(Clone)]
pub struct LoggerService {
    repo: Arc<dyn MessageRepository>,
}

impl LoggerService {
    pub fn new(repo: Arc<dyn MessageRepository>) -> Self {
        Self { repo }
    }

    /// Stores a newly seen message. A message that is already stored is
    /// returned unchanged.
    pub async fn log_message(&self, incoming: &IncomingMessage) -> Option<LoggedMessage> {
        match self.insert_or_existing(incoming).await {
            Ok(message) => Some(message),
            Err(e) => {
                error!(
                    "Logger: Error logging message {}: {}",
                    incoming.message_id, e
                );
                None
            }
        }
    }

    /// Applies an edit. Messages that were never logged (missed create
    /// events) are stored as new.
    pub async fn update_message(&self, incoming: &IncomingMessage) -> Option<LoggedMessage> {
        match self.apply_update(incoming).await {
            Ok(message) => Some(message),
            Err(e) => {
                error!(
                    "Logger: Error updating message {}: {}",
                    incoming.message_id, e
                );
                None
            }
        }
    }

    /// Returns `false` when nothing was stored under `message_id`.
    pub async fn delete_message(&self, message_id: &str) -> bool {
        let result: Result<bool, StoreError> = async {
            let Some(existing) = self.repo.find_by_message_id(message_id).await? else {
                return Ok(false);
            };
            let id = existing.id.ok_or(StoreError::Unsaved)?;
            self.repo.delete(id).await
        }
        .await;

        match result {
            Ok(true) => {
                info!("Logger: Deleted message {}", message_id);
                true
            }
            Ok(false) => {
                warn!("Logger: Attempted to delete non-existent message {}", message_id);
                false
            }
            Err(e) => {
                error!("Logger: Error deleting message {}: {}", message_id, e);
                false
            }
        }
    }

    async fn insert_or_existing(
        &self,
        incoming: &IncomingMessage,
    ) -> Result<LoggedMessage, StoreError> {
        if let Some(existing) = self.repo.find_by_message_id(&incoming.message_id).await? {
            debug!(
                "Logger: Message {} already exists, skipping",
                incoming.message_id
            );
            return Ok(existing);
        }

        match self.repo.insert(normalize(incoming)).await {
            Ok(saved) => {
                info!(
                    "Logger: Saved message {} from {} in channel {}",
                    saved.message_id, saved.author_name, saved.channel_name
                );
                Ok(saved)
            }
            // Another writer stored the same message between lookup and insert
            Err(StoreError::Duplicate(message_id)) => {
                debug!(
                    "Logger: Message {} was stored concurrently, using stored copy",
                    message_id
                );
                self.repo
                    .find_by_message_id(&message_id)
                    .await?
                    .ok_or(StoreError::NotFound(message_id))
            }
            Err(e) => Err(e),
        }
    }

    async fn apply_update(&self, incoming: &IncomingMessage) -> Result<LoggedMessage, StoreError> {
        let Some(existing) = self.repo.find_by_message_id(&incoming.message_id).await? else {
            warn!(
                "Logger: Update for unknown message {}, storing it as new",
                incoming.message_id
            );
            return self.insert_or_existing(incoming).await;
        };

        let updated = LoggedMessage {
            content: incoming.content.clone(),
            edited_timestamp: Some(now_local()),
            attachments: incoming.attachments.clone(),
            embeds: incoming.embeds.iter().map(normalize_embed).collect(),
            ..existing
        };

        let saved = self.repo.update(updated).await?;
        info!(
            "Logger: Updated message {} from {}",
            saved.message_id, saved.author_name
        );
        Ok(saved)
    }

    pub async fn message_by_id(&self, message_id: &str) -> Result<Option<LoggedMessage>, StoreError> {
        self.repo.find_by_message_id(message_id).await
    }

    pub async fn messages_by_channel(
        &self,
        channel_id: &str,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError> {
        self.repo.find_by_channel_id(channel_id, page).await
    }

    pub async fn messages_by_author(
        &self,
        author_id: &str,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError> {
        self.repo.find_by_author_id(author_id, page).await
    }

    pub async fn search_messages(
        &self,
        query: &str,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError> {
        self.repo.search_content(query, page).await
    }

    pub async fn recent_messages(
        &self,
        since: NaiveDateTime,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError> {
        self.repo.find_since(since, page).await
    }

    pub async fn channel_stats(&self, channel_id: &str) -> Result<ChannelStats, StoreError> {
        let total_messages = self.repo.count_by_channel_id(channel_id).await?;
        Ok(ChannelStats {
            channel_id: channel_id.to_string(),
            total_messages,
        })
    }
}

/// Local wall-clock time at the microsecond precision the store keeps.
pub(crate) fn to_local(ts: DateTime<Utc>) -> NaiveDateTime {
    ts.with_timezone(&Local).naive_local().trunc_subsecs(6)
}

fn now_local() -> NaiveDateTime {
    to_local(Utc::now())
}

/// Maps a gateway snapshot onto the stored record.
pub fn normalize(incoming: &IncomingMessage) -> LoggedMessage {
    LoggedMessage {
        id: None,
        message_id: incoming.message_id.clone(),
        channel_id: incoming.channel_id.clone(),
        channel_name: incoming.channel_name.clone(),
        guild_id: incoming.guild_id.clone(),
        guild_name: incoming.guild_name.clone(),
        author_id: incoming.author_id.clone(),
        author_name: incoming.author_name.clone(),
        author_discriminator: incoming.author_discriminator.clone(),
        content: incoming.content.clone(),
        timestamp: to_local(incoming.created_at),
        edited_timestamp: incoming.edited_at.map(to_local),
        attachments: incoming.attachments.clone(),
        embeds: incoming.embeds.iter().map(normalize_embed).collect(),
        reactions: incoming.reactions.clone(),
        is_bot: incoming.author_is_bot,
        message_type: incoming.kind.clone(),
    }
}

fn normalize_embed(embed: &IncomingEmbed) -> MessageEmbed {
    MessageEmbed {
        title: embed.title.clone(),
        description: embed.description.clone(),
        url: embed.url.clone(),
        color: embed.color,
        timestamp: embed.timestamp.map(to_local),
        footer_text: embed.footer_text.clone(),
        author_name: embed.author_name.clone(),
        fields: embed
            .fields
            .iter()
            .map(|f| EmbedField {
                name: f.name.clone().unwrap_or_default(),
                value: f.value.clone().unwrap_or_default(),
                inline: f.inline,
            })
            .collect(),
    }
}
