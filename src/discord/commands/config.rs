use crate::core::guild_config::{ConfigError, ConfigUpdate, GuildConfig};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Various commands related to configuration
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "ADMINISTRATOR",
    subcommands("list", "set")
)]
pub async fn config(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Lists available config options with their current values
#[poise::command(slash_command, guild_only)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let config = ctx.data().config.get_or_create(guild_id).await?;

    ctx.say(describe_config(&config)).await?;
    Ok(())
}

/// Updates config with provided values
#[poise::command(
    slash_command,
    guild_only,
    subcommands(
        "welcome_message",
        "welcome_message_attachment",
        "pins_channel_id",
        "welcome_channel_id"
    )
)]
pub async fn set(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Set Welcome Message
#[poise::command(slash_command, guild_only)]
pub async fn welcome_message(
    ctx: Context<'_>,
    #[description = "New welcome message"] message: String,
) -> Result<(), Error> {
    apply(ctx, ConfigUpdate::WelcomeMessage(message)).await
}

/// Set Welcome Message Attachment
#[poise::command(slash_command, guild_only)]
pub async fn welcome_message_attachment(
    ctx: Context<'_>,
    #[description = "New attachment url"] attachment_url: String,
) -> Result<(), Error> {
    apply(ctx, ConfigUpdate::WelcomeAttachment(attachment_url)).await
}

/// Set Pins Channel ID
#[poise::command(slash_command, guild_only)]
pub async fn pins_channel_id(
    ctx: Context<'_>,
    #[description = "New pins channel"]
    #[channel_types("Text")]
    channel: serenity::GuildChannel,
) -> Result<(), Error> {
    apply(ctx, ConfigUpdate::PinsChannel(channel.id.get())).await
}

/// Set Welcome Channel ID
#[poise::command(slash_command, guild_only)]
pub async fn welcome_channel_id(
    ctx: Context<'_>,
    #[description = "New welcome channel"]
    #[channel_types("Text")]
    channel: serenity::GuildChannel,
) -> Result<(), Error> {
    apply(ctx, ConfigUpdate::WelcomeChannel(channel.id.get())).await
}

async fn apply(ctx: Context<'_>, update: ConfigUpdate) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    match ctx.data().config.apply(guild_id, update).await {
        Ok(_) => {
            tracing::info!(guild_id, user_id = ctx.author().id.get(), "Guild config updated");
            ctx.say("Successfully updated config!").await?;
        }
        Err(ConfigError::Storage(e)) => return Err(e.into()),
        Err(e) => {
            ctx.say(e.to_string()).await?;
        }
    }
    Ok(())
}

fn describe_config(config: &GuildConfig) -> String {
    let channel = |id: Option<u64>| id.map(|id| format!("<#{}>", id)).unwrap_or_default();

    format!(
        "Configuration for {}:\n\nWelcome message: {}\nWelcome message attachment: <{}>\nPins channel: {}\nWelcome channel: {}",
        config.guild_id,
        config.welcome_message,
        config.welcome_message_attachment_url,
        channel(config.pins_channel_id),
        channel(config.welcome_channel_id),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_empty_config() {
        let text = describe_config(&GuildConfig::new(42));
        assert_eq!(
            text,
            "Configuration for 42:\n\nWelcome message: \nWelcome message attachment: <>\nPins channel: \nWelcome channel: "
        );
    }

    #[test]
    fn test_describe_config_mentions_channels() {
        let config = GuildConfig {
            guild_id: 1,
            welcome_message: "Hi <@USER_ID>".to_string(),
            welcome_message_attachment_url: "https://example.com/a.png".to_string(),
            welcome_channel_id: Some(7),
            pins_channel_id: Some(9),
        };

        let text = describe_config(&config);
        assert!(text.contains("Welcome message: Hi <@USER_ID>\n"));
        assert!(text.contains("<https://example.com/a.png>"));
        assert!(text.contains("Pins channel: <#9>\nWelcome channel: <#7>"));
    }
}
