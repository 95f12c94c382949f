use poise::serenity_prelude as serenity;
use quill::db::Database;
use quill::listener::EventListener;
use quill::services::LoggerService;
use quill::{api, commands, config::Config, gateway, Data};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration: {:?}", config);
    let discord_token = config.discord_token.clone();

    let db = Database::new(&config)?;
    db.execute_init()?;
    let logger = LoggerService::new(Arc::new(db));

    let listener = EventListener::spawn(logger.clone(), config.event_queue_capacity);
    let events = listener.sender();

    // REST API
    let tcp = tokio::net::TcpListener::bind(&config.http_bind).await?;
    info!("Query API listening on http://{}", config.http_bind);
    let (http_stop, http_stopped) = oneshot::channel::<()>();
    let app = api::router(logger.clone());
    let http = tokio::spawn(async move {
        axum::serve(tcp, app)
            .with_graceful_shutdown(async {
                let _ = http_stopped.await;
            })
            .await
    });

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            on_error: |error| Box::pin(commands::on_error(error)),
            event_handler: |ctx, event, _framework, data| {
                Box::pin(async move {
                    gateway::forward_event(ctx, event, &data.events).await;
                    Ok(())
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                info!("Bot is ready!");
                if config.register_commands {
                    let commands = &framework.options().commands;
                    match config.dev_guild_id {
                        Some(guild_id) => {
                            let guild_id = serenity::GuildId::new(guild_id);
                            poise::builtins::register_in_guild(ctx, commands, guild_id).await?;
                            info!("Registered slash commands in guild {}", guild_id);
                        }
                        None => {
                            poise::builtins::register_globally(ctx, commands).await?;
                            info!("Registered slash commands globally");
                        }
                    }
                }

                // Set bot status
                ctx.set_activity(Some(serenity::ActivityData::custom(&config.status_message)));

                Ok(Data {
                    config,
                    logger,
                    events,
                })
            })
        })
        .build();

    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT;

    let mut client = serenity::ClientBuilder::new(&discord_token, intents)
        .framework(framework)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down Discord bot...");
            shard_manager.shutdown_all().await;
        }
    });

    info!("Starting bot...");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    let _ = http_stop.send(());
    match http.await {
        Ok(Err(e)) => error!("Query API error: {}", e),
        Err(e) => error!("Query API task failed: {}", e),
        Ok(Ok(())) => {}
    }
    listener.shutdown().await;

    Ok(())
}
