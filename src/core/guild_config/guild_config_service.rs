// Guild configuration: welcome message, its attachment, and the channels the
// bot posts into.

use super::guild_config_models::{ConfigError, ConfigUpdate, GuildConfig, WelcomePlan};
use async_trait::async_trait;
use url::Url;

/// Placeholder in welcome messages that gets replaced by the new member's mention.
pub const USER_PLACEHOLDER: &str = "<@USER_ID>";

#[async_trait]
pub trait GuildConfigStore: Send + Sync {
    async fn get_config(&self, guild_id: u64) -> Result<Option<GuildConfig>, ConfigError>;
    async fn save_config(&self, config: GuildConfig) -> Result<(), ConfigError>;
}

pub struct GuildConfigService<S: GuildConfigStore> {
    store: S,
}

impl<S: GuildConfigStore> GuildConfigService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Current configuration, creating an empty one on first use.
    pub async fn get_or_create(&self, guild_id: u64) -> Result<GuildConfig, ConfigError> {
        if let Some(config) = self.store.get_config(guild_id).await? {
            return Ok(config);
        }

        let config = GuildConfig::new(guild_id);
        self.store.save_config(config.clone()).await?;
        Ok(config)
    }

    pub async fn get_config(&self, guild_id: u64) -> Result<Option<GuildConfig>, ConfigError> {
        self.store.get_config(guild_id).await
    }

    /// Apply one change and persist it. Attachment URLs are validated first.
    pub async fn apply(&self, guild_id: u64, update: ConfigUpdate) -> Result<GuildConfig, ConfigError> {
        let mut config = self
            .store
            .get_config(guild_id)
            .await?
            .unwrap_or_else(|| GuildConfig::new(guild_id));

        match update {
            ConfigUpdate::WelcomeMessage(message) => config.welcome_message = message,
            ConfigUpdate::WelcomeAttachment(url) => {
                config.welcome_message_attachment_url = validate_attachment_url(&url)?
            }
            ConfigUpdate::PinsChannel(channel_id) => config.pins_channel_id = Some(channel_id),
            ConfigUpdate::WelcomeChannel(channel_id) => {
                config.welcome_channel_id = Some(channel_id)
            }
        }

        self.store.save_config(config.clone()).await?;
        Ok(config)
    }

    /// Welcome message for a member who just joined. Requires both a channel
    /// and a message to be configured.
    pub async fn welcome_for_join(&self, guild_id: u64, user_id: u64) -> Result<WelcomePlan, ConfigError> {
        let config = self
            .store
            .get_config(guild_id)
            .await?
            .ok_or(ConfigError::NotConfigured)?;

        if config.welcome_channel_id.is_none() {
            return Err(ConfigError::NoWelcomeChannel);
        }
        if config.welcome_message.is_empty() {
            return Err(ConfigError::NoWelcomeMessage);
        }

        plan_welcome(&config, user_id)
    }

    /// Welcome message as it would look for `user_id`, for `/welcome test`.
    pub async fn welcome_preview(&self, guild_id: u64, user_id: u64) -> Result<WelcomePlan, ConfigError> {
        let config = self
            .store
            .get_config(guild_id)
            .await?
            .ok_or(ConfigError::NotConfigured)?;

        plan_welcome(&config, user_id)
    }
}

fn plan_welcome(config: &GuildConfig, user_id: u64) -> Result<WelcomePlan, ConfigError> {
    let attachment_url = if config.welcome_message_attachment_url.is_empty() {
        None
    } else {
        Some(validate_attachment_url(&config.welcome_message_attachment_url)?)
    };

    Ok(WelcomePlan {
        channel_id: config.welcome_channel_id,
        content: render_welcome_message(&config.welcome_message, user_id),
        attachment_url,
    })
}

pub fn render_welcome_message(template: &str, user_id: u64) -> String {
    template.replace(USER_PLACEHOLDER, &format!("<@{}>", user_id))
}

/// Accepts absolute http(s) URLs only, since the bot downloads them.
pub fn validate_attachment_url(raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|_| ConfigError::InvalidUrl)?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url.to_string()),
        _ => Err(ConfigError::InvalidUrl),
    }
}
