use super::format;
use crate::db::PageRequest;
use crate::{Context, Error};
use chrono::{Duration, Local, NaiveDateTime};
use poise::serenity_prelude as serenity;
use tracing::info;

const DEFAULT_RECENT_HOURS: i64 = 24;

async fn reply_ephemeral(ctx: Context<'_>, text: &str) -> Result<(), Error> {
    ctx.send(poise::CreateReply::default().content(text).ephemeral(true))
        .await?;
    Ok(())
}

/// Get statistics for the current channel
#[poise::command(slash_command)]
pub async fn stats(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;

    let channel_id = ctx.channel_id().to_string();
    let stats = ctx.data().logger.channel_stats(&channel_id).await?;

    ctx.say(format::stats(&stats)).await?;
    Ok(())
}

/// Search for messages containing specific text
#[poise::command(slash_command)]
pub async fn search(
    ctx: Context<'_>,
    #[description = "Search query"]
    #[max_length = 200]
    query: String,
) -> Result<(), Error> {
    let Some(query) = search_query(&query) else {
        reply_ephemeral(ctx, "Please provide a search query.").await?;
        return Ok(());
    };

    ctx.defer().await?;

    info!(
        "Search command received from {}: '{}'",
        ctx.author().name,
        query
    );
    let results = ctx
        .data()
        .logger
        .search_messages(query, PageRequest::first(format::SEARCH_LIMIT))
        .await?;

    ctx.say(format::search_results(query, &results)).await?;
    Ok(())
}

/// Get recent messages
#[poise::command(slash_command)]
pub async fn recent(
    ctx: Context<'_>,
    #[description = "Hours back to search (default: 24)"]
    #[min = 1]
    hours: Option<i64>,
) -> Result<(), Error> {
    let hours_back = hours.unwrap_or(DEFAULT_RECENT_HOURS);
    if hours_back < 1 {
        reply_ephemeral(ctx, "Hours must be a positive number.").await?;
        return Ok(());
    }

    ctx.defer().await?;

    let since = hours_ago(Local::now().naive_local(), hours_back);
    let results = ctx
        .data()
        .logger
        .recent_messages(since, PageRequest::first(format::RECENT_LIMIT))
        .await?;

    ctx.say(format::recent_messages(hours_back, &results)).await?;
    Ok(())
}

/// Get messages from a specific user
#[poise::command(slash_command, rename = "user-messages")]
pub async fn user_messages(
    ctx: Context<'_>,
    #[description = "User to search for"] user: serenity::User,
) -> Result<(), Error> {
    ctx.defer().await?;

    let user_id = user.id.to_string();
    let results = ctx
        .data()
        .logger
        .messages_by_author(&user_id, PageRequest::first(format::USER_MESSAGES_LIMIT))
        .await?;

    ctx.say(format::user_messages(&user_id, &results)).await?;
    Ok(())
}

/// Blank input is rejected; anything else is searched exactly as typed.
fn search_query(raw: &str) -> Option<&str> {
    if raw.trim().is_empty() {
        None
    } else {
        Some(raw)
    }
}

/// Huge windows saturate to the earliest representable time.
fn hours_ago(now: NaiveDateTime, hours: i64) -> NaiveDateTime {
    Duration::try_hours(hours)
        .and_then(|d| now.checked_sub_signed(d))
        .unwrap_or(NaiveDateTime::MIN)
}
