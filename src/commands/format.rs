//! Reply text for the message-log slash commands.

use crate::config::DISCORD_MESSAGE_LIMIT;
use crate::db::Page;
use crate::model::LoggedMessage;
use crate::services::ChannelStats;
use std::fmt::Write;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const SEARCH_LIMIT: u32 = 5;
pub const RECENT_LIMIT: u32 = 10;
pub const USER_MESSAGES_LIMIT: u32 = 5;

const SEARCH_PREVIEW_CHARS: usize = 100;
const RECENT_PREVIEW_CHARS: usize = 80;
const USER_PREVIEW_CHARS: usize = 100;

pub const GENERIC_ERROR: &str = "An error occurred while processing your command.";

/// Cuts `text` to `max_chars` characters, marking the cut with `...`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}

/// Keeps a reply inside Discord's message limit.
fn fit_reply(reply: String) -> String {
    if reply.chars().count() <= DISCORD_MESSAGE_LIMIT {
        reply
    } else {
        truncate_chars(&reply, DISCORD_MESSAGE_LIMIT - 3)
    }
}

pub fn unknown_command(name: &str) -> String {
    format!("Unknown command: {}", name)
}

pub fn stats(stats: &ChannelStats) -> String {
    format!(
        "📊 **Channel Statistics**\nChannel: <#{}>\nTotal Messages: {}\n",
        stats.channel_id, stats.total_messages
    )
}

pub fn search_results(query: &str, results: &Page<LoggedMessage>) -> String {
    if results.is_empty() {
        return format!("No messages found containing \"{}\".", query);
    }

    let mut out = String::new();
    let _ = writeln!(out, "🔍 **Search Results for \"{}\"**", query);
    let _ = writeln!(
        out,
        "Found {} total matches (showing first {}):\n",
        results.total_elements, SEARCH_LIMIT
    );
    for message in &results.content {
        let _ = writeln!(
            out,
            "**{}** ({}):\n{}\n",
            message.author_name,
            message.timestamp.format(DATE_FORMAT),
            truncate_chars(&message.content, SEARCH_PREVIEW_CHARS)
        );
    }
    fit_reply(out)
}

pub fn recent_messages(hours_back: i64, results: &Page<LoggedMessage>) -> String {
    if results.is_empty() {
        return format!("No messages found in the last {} hours.", hours_back);
    }

    let mut out = String::new();
    let _ = writeln!(out, "⏰ **Recent Messages (Last {} hours)**", hours_back);
    let _ = writeln!(
        out,
        "Found {} total messages (showing first {}):\n",
        results.total_elements, RECENT_LIMIT
    );
    for message in &results.content {
        let _ = writeln!(
            out,
            "**{}** in <#{}> ({}):\n{}\n",
            message.author_name,
            message.channel_id,
            message.timestamp.format(DATE_FORMAT),
            truncate_chars(&message.content, RECENT_PREVIEW_CHARS)
        );
    }
    fit_reply(out)
}

pub fn user_messages(user_id: &str, results: &Page<LoggedMessage>) -> String {
    if results.is_empty() {
        return "No messages found for this user.".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "👤 **Messages by <@{}>**", user_id);
    let _ = writeln!(
        out,
        "Found {} total messages (showing first {}):\n",
        results.total_elements, USER_MESSAGES_LIMIT
    );
    for message in &results.content {
        let _ = writeln!(
            out,
            "**{}** ({}):\n{}\n",
            message.channel_name,
            message.timestamp.format(DATE_FORMAT),
            truncate_chars(&message.content, USER_PREVIEW_CHARS)
        );
    }
    fit_reply(out)
}
