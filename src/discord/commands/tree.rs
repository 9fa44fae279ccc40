// Commands for the guild's member tree.
//
// Rendering is CPU-bound, so the chart is drawn on a blocking thread and
// uploaded once it is done.

use crate::core::trees::{
    ImageSink, InMemoryImage, LayoutParams, RenderError, TreeError, TreeNode, TreeRenderer,
};
use crate::discord::{Context, Error};
use crate::infra::media::PngFileSink;
use poise::serenity_prelude as serenity;
use std::path::PathBuf;
use std::sync::Arc;

use super::parse_user_id;

const CHART_FILE_NAME: &str = "tree.png";

/// Various commands related to the member tree
#[poise::command(slash_command, guild_only, subcommands("add", "update", "delete", "view"))]
pub async fn tree(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Add a member to the tree
#[poise::command(slash_command, guild_only)]
pub async fn add(
    ctx: Context<'_>,
    #[description = "User to add"] user: serenity::User,
    #[description = "Name shown in the tree"] name: String,
    #[description = "Parent of the user, leave empty for the origin"] parent: Option<serenity::User>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let parent_id = parent.map(|p| p.id.get());

    let result = ctx
        .data()
        .trees
        .add_member(guild_id, user.id.get(), &name, parent_id)
        .await;
    respond(ctx, result, "Successfully added tree member.").await
}

/// Update a tree member
#[poise::command(slash_command, guild_only)]
pub async fn update(
    ctx: Context<'_>,
    #[description = "User to update"] user: serenity::User,
    #[description = "New name"] name: Option<String>,
    #[description = "New parent"] parent: Option<serenity::User>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let parent_id = parent.map(|p| p.id.get());

    let result = ctx
        .data()
        .trees
        .update_member(guild_id, user.id.get(), name.as_deref(), parent_id)
        .await;
    respond(ctx, result, "Successfully updated tree member.").await
}

/// Delete a user from the tree
#[poise::command(slash_command, guild_only)]
pub async fn delete(
    ctx: Context<'_>,
    #[description = "ID of user to delete"] user_id: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let Some(user_id) = parse_user_id(ctx, &user_id).await? else {
        return Ok(());
    };

    let result = ctx.data().trees.remove_member(guild_id, user_id).await;
    respond(ctx, result, "Successfully deleted user from tree.").await
}

/// View the tree as an image
#[poise::command(slash_command, guild_only)]
pub async fn view(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    let tree = match ctx.data().trees.chart(guild_id).await {
        Ok(tree) => tree,
        Err(TreeError::Storage(e)) => return Err(e.into()),
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    ctx.defer().await?;

    let renderer = Arc::clone(&ctx.data().renderer);
    let archive = ctx.data().tree_archive.clone();
    let rendered =
        tokio::task::spawn_blocking(move || draw_chart(&renderer, &tree, guild_id, archive))
            .await?;

    match rendered {
        Ok(image) => {
            let attachment = serenity::CreateAttachment::bytes(image.png, image.file_name);
            ctx.send(poise::CreateReply::default().attachment(attachment))
                .await?;
        }
        Err(e) => {
            tracing::error!(guild_id, error = %e, "Failed to render tree chart");
            ctx.say("An error occurred while rendering image.").await?;
        }
    }
    Ok(())
}

/// Render the chart for upload, saving a copy into `archive` when configured.
/// A failed archive write is logged and does not stop the upload.
fn draw_chart(
    renderer: &TreeRenderer,
    tree: &TreeNode,
    guild_id: u64,
    archive: Option<PathBuf>,
) -> Result<InMemoryImage, RenderError> {
    let mut image = InMemoryImage::default();
    renderer.render(tree, &LayoutParams::default(), CHART_FILE_NAME, &mut image)?;

    if let Some(dir) = archive {
        let saved = PngFileSink::new(dir.clone())
            .map_err(RenderError::from)
            .and_then(|mut sink| sink.accept(&format!("tree-{}.png", guild_id), image.png.clone()));
        if let Err(e) = saved {
            tracing::warn!(guild_id, dir = %dir.display(), error = %e, "Failed to archive tree chart");
        }
    }

    Ok(image)
}

async fn respond(ctx: Context<'_>, result: Result<(), TreeError>, success: &str) -> Result<(), Error> {
    match result {
        Ok(()) => ctx.say(success).await?,
        Err(TreeError::Storage(e)) => return Err(e.into()),
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}
