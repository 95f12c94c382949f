use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::fs;
use std::str::FromStr;

const DEFAULT_CONFIG_FILE: &str = "quill.toml";

#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    pub database_url: String,
    pub http_bind: String,
    pub event_queue_capacity: usize,
    pub register_commands: bool,
    pub dev_guild_id: Option<u64>,
    pub status_message: String,
}

/// Optional settings file; environment variables take precedence over it.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub discord_token: Option<String>,
    pub database_url: Option<String>,
    pub http_bind: Option<String>,
    pub event_queue_capacity: Option<usize>,
    pub register_commands: Option<bool>,
    pub dev_guild_id: Option<u64>,
    pub status_message: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        let file = Self::load_file()?;
        Self::build(file)
    }

    fn load_file() -> anyhow::Result<FileConfig> {
        let explicit = env::var("QUILL_CONFIG").ok();
        let path = explicit
            .clone()
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        match fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Invalid config file {}: {}", path, e)),
            // A missing default file is fine; a missing explicit one is not
            Err(_) if explicit.is_none() => Ok(FileConfig::default()),
            Err(e) => Err(anyhow::anyhow!("Cannot read config file {}: {}", path, e)),
        }
    }

    fn build(file: FileConfig) -> anyhow::Result<Self> {
        Ok(Config {
            discord_token: env::var("DISCORD_TOKEN")
                .ok()
                .or(file.discord_token)
                .filter(|t| !t.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("DISCORD_TOKEN must be set"))?,
            database_url: env::var("DATABASE_URL")
                .ok()
                .or(file.database_url)
                .unwrap_or_else(|| "data/quill.db".to_string()),
            http_bind: env::var("HTTP_BIND")
                .ok()
                .or(file.http_bind)
                .unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            event_queue_capacity: parsed_env("EVENT_QUEUE_CAPACITY")?
                .or(file.event_queue_capacity)
                .unwrap_or(1024),
            register_commands: parsed_env("REGISTER_COMMANDS")?
                .or(file.register_commands)
                .unwrap_or(true),
            dev_guild_id: parsed_env("DEV_GUILD_ID")?.or(file.dev_guild_id),
            status_message: env::var("STATUS_MESSAGE")
                .ok()
                .or(file.status_message)
                .unwrap_or_else(|| "Taking notes".to_string()),
        })
    }
}

fn parsed_env<T: FromStr>(key: &str) -> anyhow::Result<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: {}", key, raw)),
        Err(_) => Ok(None),
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"[REDACTED]")
            .field("database_url", &self.database_url)
            .field("http_bind", &self.http_bind)
            .field("event_queue_capacity", &self.event_queue_capacity)
            .field("register_commands", &self.register_commands)
            .field("dev_guild_id", &self.dev_guild_id)
            .field("status_message", &self.status_message)
            .finish()
    }
}

/// Discord message limit is 2000 characters
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_config_logic() {
        // 1. Test missing vars
        env::remove_var("DISCORD_TOKEN");
        env::remove_var("EVENT_QUEUE_CAPACITY");
        let result = Config::build(FileConfig::default());
        assert!(result.is_err(), "Should fail when the token is missing");

        // 2. File values fill in, env vars win
        let file: FileConfig = toml::from_str(
            r#"
            discord_token = "file_token"
            database_url = "file.db"
            event_queue_capacity = 16
            "#,
        )
        .unwrap();
        env::set_var("DISCORD_TOKEN", "test_token");
        let config = Config::build(file).unwrap();
        assert_eq!(config.discord_token, "test_token");
        assert_eq!(config.event_queue_capacity, 16);
        assert!(config.register_commands);

        // 3. Invalid numbers are reported
        env::set_var("EVENT_QUEUE_CAPACITY", "lots");
        assert!(Config::build(FileConfig::default()).is_err());
        env::remove_var("EVENT_QUEUE_CAPACITY");

        // 4. Test debug redaction
        let config = Config::build(FileConfig::default()).unwrap();
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("test_token"));
        assert!(debug_output.contains("[REDACTED]"));

        // Cleanup
        env::remove_var("DISCORD_TOKEN");
    }
}
