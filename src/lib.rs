pub mod api;
pub mod commands;
pub mod config;
pub mod db;
pub mod events;
pub mod gateway;
pub mod listener;
pub mod model;
pub mod services;

/// Custom data passed to all commands
pub struct Data {
    pub config: config::Config,
    pub logger: services::LoggerService,
    /// Producer side of the listener queue, fed by the gateway event handler
    pub events: listener::EventSender,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
