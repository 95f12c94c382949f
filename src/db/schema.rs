/// Message store. Nested attachments, embeds and reactions are kept as JSON
/// documents on the row that owns them.
pub const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        message_id TEXT NOT NULL UNIQUE,
        channel_id TEXT NOT NULL,
        channel_name TEXT NOT NULL,
        guild_id TEXT,
        guild_name TEXT,
        author_id TEXT NOT NULL,
        author_name TEXT NOT NULL,
        author_discriminator TEXT NOT NULL,
        content TEXT NOT NULL,
        content_folded TEXT NOT NULL DEFAULT '',
        timestamp TEXT NOT NULL,
        edited_timestamp TEXT,
        attachments TEXT NOT NULL DEFAULT '[]',
        attachment_count INTEGER NOT NULL DEFAULT 0,
        embeds TEXT NOT NULL DEFAULT '[]',
        reactions TEXT NOT NULL DEFAULT '[]',
        is_bot BOOLEAN NOT NULL DEFAULT FALSE,
        message_type TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_messages_channel ON messages (channel_id);
    CREATE INDEX IF NOT EXISTS idx_messages_author ON messages (author_id);
    CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages (timestamp DESC);
    CREATE INDEX IF NOT EXISTS idx_messages_guild ON messages (guild_id);

    CREATE INDEX IF NOT EXISTS idx_messages_channel_date ON messages (channel_id, timestamp DESC);
    CREATE INDEX IF NOT EXISTS idx_messages_author_date ON messages (author_id, timestamp DESC);
    CREATE INDEX IF NOT EXISTS idx_messages_guild_date ON messages (guild_id, timestamp DESC);
";
