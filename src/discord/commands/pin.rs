// "Pin Message" context menu.
//
// Discord caps native pins per channel, so pinned messages are reposted into
// a dedicated channel through a webhook owned by the bot. The repost carries
// the invoker's name and avatar, plus a button that jumps back to the source.

use crate::discord::{Context, Data, Error};
use crate::infra::media::FetchError;
use poise::serenity_prelude as serenity;

const MAX_ACTION_ROWS: usize = 5;

/// Pin a message into the configured pins channel
#[poise::command(context_menu_command = "Pin Message", guild_only)]
pub async fn pin_message(
    ctx: Context<'_>,
    #[description = "Message to pin"] message: serenity::Message,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?;

    let pins_channel = ctx
        .data()
        .config
        .get_config(guild_id.get())
        .await?
        .and_then(|config| config.pins_channel_id);
    let Some(pins_channel) = pins_channel.map(serenity::ChannelId::new) else {
        ctx.say("Pins channel is not configured, set one with `/config set pins_channel_id`.")
            .await?;
        return Ok(());
    };

    if pins_channel.to_channel(ctx).await.is_err() {
        ctx.say("Configured pins channel does not exist.").await?;
        return Ok(());
    }

    // Re-uploading attachments can take a while.
    ctx.defer().await?;

    let webhooks = match pins_channel.webhooks(ctx.http()).await {
        Ok(webhooks) => webhooks,
        Err(e) => {
            tracing::warn!(guild_id = guild_id.get(), error = %e, "Failed to list webhooks");
            ctx.say("Failed to get guild webhooks, check bot permissions.")
                .await?;
            return Ok(());
        }
    };

    let bot_id = ctx.framework().bot_id;
    let owned = webhooks
        .into_iter()
        .find(|w| w.token.is_some() && w.user.as_ref().map(|u| u.id) == Some(bot_id));

    let webhook = match owned {
        Some(webhook) => webhook,
        None => {
            let bot_name = ctx.cache().current_user().name.clone();
            let create = serenity::CreateWebhook::new(webhook_name(&bot_name));
            match pins_channel.create_webhook(ctx.http(), create).await {
                Ok(webhook) => webhook,
                Err(e) => {
                    tracing::warn!(guild_id = guild_id.get(), error = %e, "Failed to create pins webhook");
                    ctx.say("Failed to create a webhook, please create one yourself or check bot permissions.")
                        .await?;
                    return Ok(());
                }
            }
        }
    };

    let files = match download_attachments(ctx.data(), &message).await {
        Ok(files) => files,
        Err(e) => {
            tracing::warn!(message_id = message.id.get(), error = %e, "Failed to download attachment");
            ctx.say("Failed to download message attachment, please try again.")
                .await?;
            return Ok(());
        }
    };

    let (author_name, author_avatar) = match ctx.author_member().await {
        Some(member) => (member.display_name().to_string(), member.face()),
        None => (ctx.author().name.clone(), ctx.author().face()),
    };

    let jump = jump_url(guild_id.get(), message.channel_id.get(), message.id.get());

    let repost = serenity::ExecuteWebhook::new()
        .username(author_name)
        .avatar_url(author_avatar)
        .content(message.content.clone())
        .embeds(message.embeds.iter().cloned().map(serenity::CreateEmbed::from).collect())
        .tts(message.tts)
        .add_files(files)
        .components(repost_components(&message.components, jump))
        .allowed_mentions(serenity::CreateAllowedMentions::new());

    if let Err(e) = webhook.execute(ctx.http(), false, repost).await {
        tracing::error!(guild_id = guild_id.get(), error = %e, "Failed to send pinned message");
        ctx.say("Failed to send the pinned message, please try again.")
            .await?;
        return Ok(());
    }

    tracing::info!(
        guild_id = guild_id.get(),
        message_id = message.id.get(),
        pins_channel = pins_channel.get(),
        "Pinned message"
    );

    ctx.say(format!(
        "<@{}> pinned a message from this channel. See all pinned messages <#{}>",
        ctx.author().id,
        pins_channel
    ))
    .await?;
    Ok(())
}

async fn download_attachments(
    data: &Data,
    message: &serenity::Message,
) -> Result<Vec<serenity::CreateAttachment>, FetchError> {
    let mut files = Vec::with_capacity(message.attachments.len());
    for attachment in &message.attachments {
        let file = data.media.fetch(&attachment.url).await?;
        files.push(serenity::CreateAttachment::bytes(
            file.bytes,
            attachment.filename.clone(),
        ));
    }
    Ok(files)
}

/// Link buttons from the source message, followed by a row with the Jump
/// button. Interactive components belong to whichever app sent them, so they
/// are left out.
fn repost_components(source: &[serenity::ActionRow], jump_url: String) -> Vec<serenity::CreateActionRow> {
    let mut rows: Vec<_> = source
        .iter()
        .filter_map(|row| {
            let buttons: Vec<_> = row
                .components
                .iter()
                .filter_map(|component| match component {
                    serenity::ActionRowComponent::Button(button) => link_button(button),
                    _ => None,
                })
                .collect();
            (!buttons.is_empty()).then_some(serenity::CreateActionRow::Buttons(buttons))
        })
        .collect();

    // Discord allows five rows per message, the last one is ours.
    rows.truncate(MAX_ACTION_ROWS - 1);
    rows.push(serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new_link(jump_url).label("Jump"),
    ]));
    rows
}

fn link_button(button: &serenity::Button) -> Option<serenity::CreateButton> {
    let serenity::ButtonKind::Link { url } = &button.data else {
        return None;
    };

    let mut link = serenity::CreateButton::new_link(url.clone()).disabled(button.disabled);
    if let Some(label) = &button.label {
        link = link.label(label.clone());
    }
    if let Some(emoji) = &button.emoji {
        link = link.emoji(emoji.clone());
    }
    Some(link)
}

fn webhook_name(bot_name: &str) -> String {
    format!("Pins [{}]", bot_name)
}

fn jump_url(guild_id: u64, channel_id: u64, message_id: u64) -> String {
    format!(
        "https://discord.com/channels/{}/{}/{}",
        guild_id, channel_id, message_id
    )
}
