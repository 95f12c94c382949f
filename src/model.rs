//! Stored representation of a logged Discord message.
//!
//! A `LoggedMessage` owns its attachments, embeds and reactions; none of the
//! nested records are shared between messages.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedMessage {
    /// Storage row id, `None` until the record has been inserted.
    pub id: Option<i64>,
    pub message_id: String,
    pub channel_id: String,
    pub channel_name: String,
    pub guild_id: Option<String>,
    pub guild_name: Option<String>,
    pub author_id: String,
    pub author_name: String,
    pub author_discriminator: String,
    pub content: String,
    pub timestamp: NaiveDateTime,
    pub edited_timestamp: Option<NaiveDateTime>,
    #[serde(default)]
    pub attachments: Vec<MessageAttachment>,
    #[serde(default)]
    pub embeds: Vec<MessageEmbed>,
    #[serde(default)]
    pub reactions: Vec<MessageReaction>,
    #[serde(default)]
    pub is_bot: bool,
    pub message_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageAttachment {
    pub id: String,
    pub filename: String,
    pub url: String,
    pub proxy_url: String,
    pub size: u64,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEmbed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub color: Option<u32>,
    pub timestamp: Option<NaiveDateTime>,
    pub footer_text: Option<String>,
    pub author_name: Option<String>,
    #[serde(default)]
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageReaction {
    pub emoji: String,
    pub count: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("required field '{0}' is empty")]
    MissingField(&'static str),
}

impl LoggedMessage {
    /// Required-field checks applied before a record reaches storage.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("messageId", &self.message_id),
            ("channelId", &self.channel_id),
            ("authorId", &self.author_id),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField(name));
            }
        }
        Ok(())
    }

    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;

    pub(crate) fn sample_message(message_id: &str) -> LoggedMessage {
        LoggedMessage {
            id: None,
            message_id: message_id.to_string(),
            channel_id: "c1".to_string(),
            channel_name: "general".to_string(),
            guild_id: Some("g1".to_string()),
            guild_name: Some("Guild".to_string()),
            author_id: "u1".to_string(),
            author_name: "alice".to_string(),
            author_discriminator: "0".to_string(),
            content: "hello".to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            edited_timestamp: None,
            attachments: Vec::new(),
            embeds: Vec::new(),
            reactions: Vec::new(),
            is_bot: false,
            message_type: "Regular".to_string(),
        }
    }

    #[test]
    fn test_validate_required_fields() {
        let msg = sample_message("m1");
        assert!(msg.validate().is_ok());

        let mut missing_author = msg.clone();
        missing_author.author_id = "  ".to_string();
        assert_eq!(
            missing_author.validate(),
            Err(ValidationError::MissingField("authorId"))
        );

        // Empty content is a valid message (e.g. attachment-only)
        let mut empty_content = msg;
        empty_content.content = String::new();
        assert!(empty_content.validate().is_ok());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(sample_message("m1")).unwrap();
        assert_eq!(json["messageId"], "m1");
        assert_eq!(json["isBot"], false);
        assert!(json.get("editedTimestamp").is_some());
    }
}
