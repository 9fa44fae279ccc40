use thiserror::Error;

/// Per-guild settings. Empty strings and `None` mean "not configured".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuildConfig {
    pub guild_id: u64,
    pub welcome_message: String,
    pub welcome_message_attachment_url: String,
    pub welcome_channel_id: Option<u64>,
    pub pins_channel_id: Option<u64>,
}

impl GuildConfig {
    pub fn new(guild_id: u64) -> Self {
        Self {
            guild_id,
            ..Default::default()
        }
    }
}

/// A single `/config set` change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigUpdate {
    WelcomeMessage(String),
    WelcomeAttachment(String),
    PinsChannel(u64),
    WelcomeChannel(u64),
}

/// What to post when someone joins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomePlan {
    pub channel_id: Option<u64>,
    pub content: String,
    pub attachment_url: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Please provide a valid url.")]
    InvalidUrl,
    #[error("Server is not configured.")]
    NotConfigured,
    #[error("Welcome channel is not configured")]
    NoWelcomeChannel,
    #[error("Welcome message is not configured")]
    NoWelcomeMessage,
    #[error("Storage error: {0}")]
    Storage(String),
}
