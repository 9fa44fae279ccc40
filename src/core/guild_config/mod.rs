pub mod guild_config_models;
pub mod guild_config_service;

pub use guild_config_models::{ConfigError, ConfigUpdate, GuildConfig};
pub use guild_config_service::{GuildConfigService, GuildConfigStore};
