pub mod logger;

pub use logger::{ChannelStats, LoggerService};
