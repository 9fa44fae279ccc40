use crate::core::guild_config::ConfigError;
use crate::discord::events::welcome_attachment;
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Various commands related to welcome
#[poise::command(slash_command, guild_only, subcommands("test"))]
pub async fn welcome(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Test welcome message
#[poise::command(slash_command, guild_only)]
pub async fn test(
    ctx: Context<'_>,
    #[description = "User to welcome"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let user_id = user.as_ref().unwrap_or_else(|| ctx.author()).id.get();

    let plan = match ctx.data().config.welcome_preview(guild_id, user_id).await {
        Ok(plan) => plan,
        Err(ConfigError::Storage(e)) => return Err(e.into()),
        Err(ConfigError::InvalidUrl) => {
            ctx.say("Attachment url is invalid.").await?;
            return Ok(());
        }
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    if plan.content.is_empty() && plan.attachment_url.is_none() {
        ctx.say(ConfigError::NoWelcomeMessage.to_string()).await?;
        return Ok(());
    }

    // Downloading the image can take longer than the interaction window.
    ctx.defer().await?;

    let mut reply = poise::CreateReply::default().content(plan.content);
    if let Some(url) = plan.attachment_url.as_deref() {
        if let Some(attachment) = welcome_attachment(ctx.data(), guild_id, url).await {
            reply = reply.attachment(attachment);
        }
    }

    ctx.send(reply).await?;
    Ok(())
}
