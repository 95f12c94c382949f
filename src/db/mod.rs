mod page;
mod repository;
pub mod schema;

pub use page::{Direction, Page, PageRequest, Sort, SortError, SortField};
pub use repository::MessageRepository;

use crate::config::Config;
use crate::model::{LoggedMessage, ValidationError};
use chrono::{NaiveDateTime, SubsecRound};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info};

/// Fixed-width so that lexicographic order matches chronological order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const COLUMNS: &str = "id, message_id, channel_id, channel_name, guild_id, guild_name, \
    author_id, author_name, author_discriminator, content, timestamp, edited_timestamp, \
    attachments, embeds, reactions, is_bot, message_type";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("message {0} already exists")]
    Duplicate(String),
    #[error("message {0} not found")]
    NotFound(String),
    #[error("invalid message: {0}")]
    Invalid(#[from] ValidationError),
    #[error("record has no storage id")]
    Unsaved,
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("document encoding error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("stored timestamp is malformed: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error("database connection lock poisoned")]
    Poisoned,
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// WHERE clause fragments with their positional parameters.
#[derive(Debug, Default, Clone)]
pub(crate) struct Filter {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl Filter {
    pub(crate) fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.clauses.push(format!("{} = ?", column));
        self.params.push(value.into());
        self
    }

    pub(crate) fn at_least(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.clauses.push(format!("{} >= ?", column));
        self.params.push(value.into());
        self
    }

    pub(crate) fn at_most(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.clauses.push(format!("{} <= ?", column));
        self.params.push(value.into());
        self
    }

    /// `column` must hold text already passed through [`fold_case`].
    pub(crate) fn contains_ignore_case(mut self, column: &str, needle: &str) -> Self {
        self.clauses.push(format!("{} LIKE ? ESCAPE '\\'", column));
        self.params
            .push(Value::Text(format!("%{}%", escape_like(&fold_case(needle)))));
        self
    }

    pub(crate) fn raw(mut self, clause: &str) -> Self {
        self.clauses.push(clause.to_string());
        self
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// Unicode lowercase; SQLite's own `LIKE` only folds ASCII.
pub(crate) fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub(crate) fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
}

/// The record as it reads back: stored timestamps keep microseconds only.
fn at_stored_precision(message: &LoggedMessage) -> LoggedMessage {
    let mut stored = message.clone();
    stored.timestamp = stored.timestamp.trunc_subsecs(6);
    stored.edited_timestamp = stored.edited_timestamp.map(|ts| ts.trunc_subsecs(6));
    stored
}

/// Raw column values; JSON documents and timestamps are decoded afterwards.
struct MessageRow {
    id: i64,
    message_id: String,
    channel_id: String,
    channel_name: String,
    guild_id: Option<String>,
    guild_name: Option<String>,
    author_id: String,
    author_name: String,
    author_discriminator: String,
    content: String,
    timestamp: String,
    edited_timestamp: Option<String>,
    attachments: String,
    embeds: String,
    reactions: String,
    is_bot: bool,
    message_type: String,
}

impl MessageRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            message_id: row.get(1)?,
            channel_id: row.get(2)?,
            channel_name: row.get(3)?,
            guild_id: row.get(4)?,
            guild_name: row.get(5)?,
            author_id: row.get(6)?,
            author_name: row.get(7)?,
            author_discriminator: row.get(8)?,
            content: row.get(9)?,
            timestamp: row.get(10)?,
            edited_timestamp: row.get(11)?,
            attachments: row.get(12)?,
            embeds: row.get(13)?,
            reactions: row.get(14)?,
            is_bot: row.get(15)?,
            message_type: row.get(16)?,
        })
    }

    fn into_message(self) -> Result<LoggedMessage, StoreError> {
        Ok(LoggedMessage {
            id: Some(self.id),
            message_id: self.message_id,
            channel_id: self.channel_id,
            channel_name: self.channel_name,
            guild_id: self.guild_id,
            guild_name: self.guild_name,
            author_id: self.author_id,
            author_name: self.author_name,
            author_discriminator: self.author_discriminator,
            content: self.content,
            timestamp: parse_timestamp(&self.timestamp)?,
            edited_timestamp: self
                .edited_timestamp
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
            attachments: serde_json::from_str(&self.attachments)?,
            embeds: serde_json::from_str(&self.embeds)?,
            reactions: serde_json::from_str(&self.reactions)?,
            is_bot: self.is_bot,
            message_type: self.message_type,
        })
    }
}

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(config: &Config) -> Result<Self, StoreError> {
        Self::open(&config.database_url)
    }

    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn execute_init(&self) -> Result<(), StoreError> {
        info!("Database: Initializing schema...");
        let conn = self.conn()?;
        conn.execute_batch(schema::SCHEMA)?;
        debug!("Database: Schema initialized successfully");
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Runs synchronous SQLite work off the async runtime.
    pub async fn run_blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || f(&db)).await?
    }

    pub(crate) fn select_by_message_id(
        &self,
        message_id: &str,
    ) -> Result<Option<LoggedMessage>, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM messages WHERE message_id = ?1", COLUMNS);
        let row = conn
            .query_row(&sql, [message_id], MessageRow::from_row)
            .optional()?;
        row.map(MessageRow::into_message).transpose()
    }

    pub(crate) fn select_page(
        &self,
        filter: &Filter,
        request: &PageRequest,
    ) -> Result<Page<LoggedMessage>, StoreError> {
        let conn = self.conn()?;
        let where_sql = filter.where_sql();

        let count_sql = format!("SELECT COUNT(*) FROM messages{}", where_sql);
        let total: i64 =
            conn.query_row(&count_sql, params_from_iter(filter.params.iter()), |row| {
                row.get(0)
            })?;

        // Ties on the sort key fall back to storage order
        let sql = format!(
            "SELECT {} FROM messages{} ORDER BY {} {}, id ASC LIMIT ? OFFSET ?",
            COLUMNS,
            where_sql,
            request.sort.field.column(),
            request.sort.direction.sql()
        );
        let mut params = filter.params.clone();
        params.push(Value::Integer(i64::from(request.size)));
        params.push(Value::Integer(request.offset()));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), MessageRow::from_row)?;

        let mut content = Vec::new();
        for row in rows {
            content.push(row?.into_message()?);
        }

        debug!(
            "Database: Page {} returned {} of {} messages",
            request.page,
            content.len(),
            total
        );
        Ok(Page::new(content, request, total.max(0) as u64))
    }

    pub(crate) fn count_where(&self, filter: &Filter) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT COUNT(*) FROM messages{}", filter.where_sql());
        let count: i64 =
            conn.query_row(&sql, params_from_iter(filter.params.iter()), |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    pub(crate) fn insert_message(&self, message: &LoggedMessage) -> Result<LoggedMessage, StoreError> {
        message.validate()?;
        let attachments = serde_json::to_string(&message.attachments)?;
        let embeds = serde_json::to_string(&message.embeds)?;
        let reactions = serde_json::to_string(&message.reactions)?;

        debug!(
            "Database: Saving message {} from user {} in channel {}",
            message.message_id, message.author_id, message.channel_id
        );
        let conn = self.conn()?;
        let result = conn.execute(
            "INSERT INTO messages (message_id, channel_id, channel_name, guild_id, guild_name,
                author_id, author_name, author_discriminator, content, content_folded, timestamp,
                edited_timestamp, attachments, attachment_count, embeds, reactions, is_bot,
                message_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            rusqlite::params![
                message.message_id,
                message.channel_id,
                message.channel_name,
                message.guild_id,
                message.guild_name,
                message.author_id,
                message.author_name,
                message.author_discriminator,
                message.content,
                fold_case(&message.content),
                format_timestamp(&message.timestamp),
                message.edited_timestamp.as_ref().map(format_timestamp),
                attachments,
                message.attachments.len() as i64,
                embeds,
                reactions,
                message.is_bot,
                message.message_type,
            ],
        );

        match result {
            Ok(_) => {
                let mut saved = at_stored_precision(message);
                saved.id = Some(conn.last_insert_rowid());
                Ok(saved)
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation
                    && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(StoreError::Duplicate(message.message_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn update_row(&self, message: &LoggedMessage) -> Result<LoggedMessage, StoreError> {
        message.validate()?;
        let id = message.id.ok_or(StoreError::Unsaved)?;
        let attachments = serde_json::to_string(&message.attachments)?;
        let embeds = serde_json::to_string(&message.embeds)?;
        let reactions = serde_json::to_string(&message.reactions)?;

        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE messages SET channel_id = ?1, channel_name = ?2, guild_id = ?3, guild_name = ?4,
                author_id = ?5, author_name = ?6, author_discriminator = ?7, content = ?8,
                content_folded = ?9, timestamp = ?10, edited_timestamp = ?11, attachments = ?12,
                attachment_count = ?13, embeds = ?14, reactions = ?15, is_bot = ?16,
                message_type = ?17
             WHERE id = ?18",
            rusqlite::params![
                message.channel_id,
                message.channel_name,
                message.guild_id,
                message.guild_name,
                message.author_id,
                message.author_name,
                message.author_discriminator,
                message.content,
                fold_case(&message.content),
                format_timestamp(&message.timestamp),
                message.edited_timestamp.as_ref().map(format_timestamp),
                attachments,
                message.attachments.len() as i64,
                embeds,
                reactions,
                message.is_bot,
                message.message_type,
                id,
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(message.message_id.clone()));
        }
        Ok(at_stored_precision(message))
    }

    pub(crate) fn delete_row(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::tests::sample_message;
    use crate::model::{EmbedField, MessageAttachment, MessageEmbed, MessageReaction};

    pub(crate) fn test_db() -> Database {
        let db = Database::open(":memory:").unwrap();
        db.execute_init().unwrap();
        db
    }

    #[test]
    fn test_db_init_and_save() {
        let db = test_db();
        let saved = db.insert_message(&sample_message("1")).unwrap();
        assert!(saved.id.is_some());

        let loaded = db.select_by_message_id("1").unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert!(db.select_by_message_id("2").unwrap().is_none());
    }

    #[test]
    fn test_nested_documents_round_trip() {
        let db = test_db();
        let mut msg = sample_message("1");
        msg.attachments.push(MessageAttachment {
            id: "a1".to_string(),
            filename: "cat.png".to_string(),
            url: "https://cdn.example/cat.png".to_string(),
            proxy_url: "https://media.example/cat.png".to_string(),
            size: 2048,
            content_type: Some("image/png".to_string()),
        });
        msg.embeds.push(MessageEmbed {
            title: Some("Title".to_string()),
            color: Some(0x5865F2),
            fields: vec![EmbedField {
                name: "k".to_string(),
                value: "v".to_string(),
                inline: true,
            }],
            ..Default::default()
        });
        msg.reactions.push(MessageReaction {
            emoji: "👍".to_string(),
            count: 3,
        });

        db.insert_message(&msg).unwrap();
        let loaded = db.select_by_message_id("1").unwrap().unwrap();
        assert_eq!(loaded.attachments, msg.attachments);
        assert_eq!(loaded.embeds, msg.embeds);
        assert_eq!(loaded.reactions, msg.reactions);
    }

    #[test]
    fn test_unique_message_id() {
        let db = test_db();
        db.insert_message(&sample_message("1")).unwrap();
        let err = db.insert_message(&sample_message("1")).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(id) if id == "1"));
        assert_eq!(db.count_where(&Filter::default()).unwrap(), 1);
    }

    #[test]
    fn test_insert_rejects_invalid_record() {
        let db = test_db();
        let mut msg = sample_message("1");
        msg.channel_id.clear();
        assert!(matches!(
            db.insert_message(&msg),
            Err(StoreError::Invalid(_))
        ));
    }

    #[test]
    fn test_update_and_delete_row() {
        let db = test_db();
        let mut saved = db.insert_message(&sample_message("1")).unwrap();
        saved.content = "changed".to_string();
        db.update_row(&saved).unwrap();
        assert_eq!(
            db.select_by_message_id("1").unwrap().unwrap().content,
            "changed"
        );

        let id = saved.id.unwrap();
        assert!(db.delete_row(id).unwrap());
        assert!(!db.delete_row(id).unwrap());
        assert!(matches!(db.update_row(&saved), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_written_record_matches_read_back() {
        let db = test_db();
        let mut msg = sample_message("1");
        msg.timestamp += chrono::Duration::nanoseconds(987_654_321);
        let saved = db.insert_message(&msg).unwrap();
        assert_eq!(db.select_by_message_id("1").unwrap().unwrap(), saved);

        let mut edited = saved;
        edited.edited_timestamp = Some(msg.timestamp + chrono::Duration::nanoseconds(1_001));
        let updated = db.update_row(&edited).unwrap();
        assert_eq!(db.select_by_message_id("1").unwrap().unwrap(), updated);
    }

    #[test]
    fn test_search_with_special_chars() {
        let db = test_db();
        let mut msg = sample_message("1");
        msg.content = "normal message".to_string();
        db.insert_message(&msg).unwrap();
        let mut pct = sample_message("2");
        pct.content = "100% done".to_string();
        db.insert_message(&pct).unwrap();

        // This should NOT cause SQL injection
        let filter = Filter::default()
            .contains_ignore_case("content_folded", "'; DROP TABLE messages; --");
        let page = db.select_page(&filter, &PageRequest::first(10)).unwrap();
        assert!(page.is_empty());

        // Wildcards in the needle are matched literally
        let filter = Filter::default().contains_ignore_case("content_folded", "%");
        let page = db.select_page(&filter, &PageRequest::first(10)).unwrap();
        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].message_id, "2");
    }

    #[test]
    fn test_timestamp_format_orders_lexicographically() {
        let earlier = NaiveDateTime::parse_from_str("2024-05-01 09:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let later = earlier + chrono::Duration::milliseconds(1500);
        assert!(format_timestamp(&earlier) < format_timestamp(&later));
        assert_eq!(parse_timestamp(&format_timestamp(&later)).unwrap(), later);
    }

    #[tokio::test]
    async fn test_run_blocking() {
        let db = test_db();
        let saved = db
            .run_blocking(|db| db.insert_message(&sample_message("1")))
            .await
            .unwrap();
        assert_eq!(saved.message_id, "1");
    }
}
