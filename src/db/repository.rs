use super::{format_timestamp, Database, Filter, Page, PageRequest, StoreError};
use crate::model::LoggedMessage;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use rusqlite::types::Value;

/// Query surface over stored messages, one method per supported query.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn find_by_message_id(&self, message_id: &str)
        -> Result<Option<LoggedMessage>, StoreError>;

    async fn find_by_channel_id(
        &self,
        channel_id: &str,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError>;

    async fn find_by_author_id(
        &self,
        author_id: &str,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError>;

    async fn find_by_author_and_channel(
        &self,
        author_id: &str,
        channel_id: &str,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError>;

    async fn find_by_guild_id(
        &self,
        guild_id: &str,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError>;

    /// Both bounds are inclusive.
    async fn find_by_timestamp_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError>;

    async fn find_by_channel_and_timestamp_between(
        &self,
        channel_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError>;

    /// Case-insensitive substring match on message content.
    async fn search_content(
        &self,
        query: &str,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError>;

    async fn count_by_channel_id(&self, channel_id: &str) -> Result<u64, StoreError>;

    async fn count_by_author_id(&self, author_id: &str) -> Result<u64, StoreError>;

    async fn find_since(
        &self,
        since: NaiveDateTime,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError>;

    async fn find_with_attachments(
        &self,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError>;

    async fn find_by_bot_flag(
        &self,
        is_bot: bool,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError>;

    /// Fails with [`StoreError::Duplicate`] if the message id is already stored.
    async fn insert(&self, message: LoggedMessage) -> Result<LoggedMessage, StoreError>;

    async fn update(&self, message: LoggedMessage) -> Result<LoggedMessage, StoreError>;

    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
}

impl Database {
    async fn page(
        &self,
        filter: Filter,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError> {
        self.run_blocking(move |db| db.select_page(&filter, &page))
            .await
    }

    async fn count(&self, filter: Filter) -> Result<u64, StoreError> {
        self.run_blocking(move |db| db.count_where(&filter)).await
    }
}

fn ts(value: &NaiveDateTime) -> Value {
    Value::Text(format_timestamp(value))
}

#[async_trait]
impl MessageRepository for Database {
    async fn find_by_message_id(
        &self,
        message_id: &str,
    ) -> Result<Option<LoggedMessage>, StoreError> {
        let message_id = message_id.to_string();
        self.run_blocking(move |db| db.select_by_message_id(&message_id))
            .await
    }

    async fn find_by_channel_id(
        &self,
        channel_id: &str,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError> {
        let filter = Filter::default().eq("channel_id", channel_id.to_string());
        self.page(filter, page).await
    }

    async fn find_by_author_id(
        &self,
        author_id: &str,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError> {
        let filter = Filter::default().eq("author_id", author_id.to_string());
        self.page(filter, page).await
    }

    async fn find_by_author_and_channel(
        &self,
        author_id: &str,
        channel_id: &str,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError> {
        let filter = Filter::default()
            .eq("author_id", author_id.to_string())
            .eq("channel_id", channel_id.to_string());
        self.page(filter, page).await
    }

    async fn find_by_guild_id(
        &self,
        guild_id: &str,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError> {
        let filter = Filter::default().eq("guild_id", guild_id.to_string());
        self.page(filter, page).await
    }

    async fn find_by_timestamp_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError> {
        let filter = Filter::default()
            .at_least("timestamp", ts(&start))
            .at_most("timestamp", ts(&end));
        self.page(filter, page).await
    }

    async fn find_by_channel_and_timestamp_between(
        &self,
        channel_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError> {
        let filter = Filter::default()
            .eq("channel_id", channel_id.to_string())
            .at_least("timestamp", ts(&start))
            .at_most("timestamp", ts(&end));
        self.page(filter, page).await
    }

    async fn search_content(
        &self,
        query: &str,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError> {
        let filter = Filter::default().contains_ignore_case("content_folded", query);
        self.page(filter, page).await
    }

    async fn count_by_channel_id(&self, channel_id: &str) -> Result<u64, StoreError> {
        self.count(Filter::default().eq("channel_id", channel_id.to_string()))
            .await
    }

    async fn count_by_author_id(&self, author_id: &str) -> Result<u64, StoreError> {
        self.count(Filter::default().eq("author_id", author_id.to_string()))
            .await
    }

    async fn find_since(
        &self,
        since: NaiveDateTime,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError> {
        let filter = Filter::default().at_least("timestamp", ts(&since));
        self.page(filter, page).await
    }

    async fn find_with_attachments(
        &self,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError> {
        self.page(Filter::default().raw("attachment_count > 0"), page)
            .await
    }

    async fn find_by_bot_flag(
        &self,
        is_bot: bool,
        page: PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError> {
        self.page(Filter::default().eq("is_bot", is_bot), page).await
    }

    async fn insert(&self, message: LoggedMessage) -> Result<LoggedMessage, StoreError> {
        self.run_blocking(move |db| db.insert_message(&message))
            .await
    }

    async fn update(&self, message: LoggedMessage) -> Result<LoggedMessage, StoreError> {
        self.run_blocking(move |db| db.update_row(&message)).await
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        self.run_blocking(move |db| db.delete_row(id)).await
    }
}
