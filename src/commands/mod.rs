pub mod format;
pub mod logs;

use crate::{Data, Error};
use poise::serenity_prelude as serenity;
use tracing::{error, warn};

/// Commands registered with Discord at startup.
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        logs::stats(),
        logs::search(),
        logs::recent(),
        logs::user_messages(),
    ]
}

/// Replies to failures without exposing error details to the user.
pub async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!(
                "Error handling slash command {}: {}",
                ctx.command().name,
                error
            );
            let reply = poise::CreateReply::default()
                .content(format::GENERIC_ERROR)
                .ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                error!("Failed to send error reply: {}", e);
            }
        }
        poise::FrameworkError::UnknownInteraction {
            ctx, interaction, ..
        } => {
            warn!("Unknown command received: {}", interaction.data.name);
            let response = serenity::CreateInteractionResponse::Message(
                serenity::CreateInteractionResponseMessage::new()
                    .content(format::unknown_command(&interaction.data.name))
                    .ephemeral(true),
            );
            if let Err(e) = interaction.create_response(ctx, response).await {
                error!("Failed to answer unknown command: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling framework error: {}", e);
            }
        }
    }
}
