// Gateway events that aren't commands.

use crate::core::guild_config::ConfigError;
use crate::discord::Data;
use anyhow::Result;
use poise::serenity_prelude::{self as serenity, Context};

/// File name the welcome image is uploaded under, whatever its source.
pub const WELCOME_FILE_NAME: &str = "welcome.png";

/// Post the guild's welcome message for a member who just joined.
pub async fn handle_member_join(ctx: &Context, data: &Data, member: &serenity::Member) -> Result<()> {
    let guild_id = member.guild_id.get();
    let user_id = member.user.id.get();

    let plan = match data.config.welcome_for_join(guild_id, user_id).await {
        Ok(plan) => plan,
        Err(ConfigError::Storage(e)) => return Err(anyhow::anyhow!(e)),
        Err(reason) => {
            tracing::info!(guild_id, %reason, "Skipping welcome message");
            return Ok(());
        }
    };

    let Some(channel_id) = plan.channel_id else {
        return Ok(());
    };

    let mut message = serenity::CreateMessage::new().content(plan.content);
    if let Some(url) = plan.attachment_url.as_deref() {
        if let Some(attachment) = welcome_attachment(data, guild_id, url).await {
            message = message.add_file(attachment);
        }
    }

    serenity::ChannelId::new(channel_id)
        .send_message(&ctx.http, message)
        .await?;

    tracing::info!(guild_id, user_id, channel_id, "Sent welcome message");
    Ok(())
}

/// Download the configured welcome image. A failed download is logged and
/// the message goes out without it.
pub async fn welcome_attachment(
    data: &Data,
    guild_id: u64,
    url: &str,
) -> Option<serenity::CreateAttachment> {
    match data.media.fetch(url).await {
        Ok(file) => {
            tracing::debug!(guild_id, content_type = ?file.content_type, "Fetched welcome attachment");
            Some(serenity::CreateAttachment::bytes(file.bytes, WELCOME_FILE_NAME))
        }
        Err(e) => {
            tracing::warn!(guild_id, url, error = %e, "Failed to fetch welcome attachment");
            None
        }
    }
}
