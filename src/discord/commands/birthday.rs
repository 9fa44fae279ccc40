// Birthday reminders. Entries belong to whoever added them, so these
// commands work in DMs as well as in servers.

use crate::core::birthdays::{month_name, ordinal, BirthdayError, BirthdayListEntry, BirthdayUpdate};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

use super::parse_user_id;

/// Various commands relating to birthdays
#[poise::command(slash_command, subcommands("add", "update", "delete", "list"))]
pub async fn birthday(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Add birthday entry
#[poise::command(slash_command)]
pub async fn add(
    ctx: Context<'_>,
    #[description = "ID of user"] user_id: String,
    #[description = "Name of user"] name: String,
    #[description = "Birth month"]
    #[min = 1]
    #[max = 12]
    month: u32,
    #[description = "Birth day"]
    #[min = 1]
    #[max = 31]
    day: u32,
) -> Result<(), Error> {
    let Some(user_id) = parse_user_id(ctx, &user_id).await? else {
        return Ok(());
    };
    let author_id = ctx.author().id.get();

    let result = ctx
        .data()
        .birthdays
        .add(author_id, user_id, &name, month, day)
        .await;
    respond(ctx, result, "Successfully added birthday entry.").await
}

/// Update birthday entry
#[poise::command(slash_command)]
pub async fn update(
    ctx: Context<'_>,
    #[description = "ID of user to update"] user_id: String,
    #[description = "New name of user"] name: Option<String>,
    #[description = "New birth month"]
    #[min = 1]
    #[max = 12]
    month: Option<u32>,
    #[description = "New birth day"]
    #[min = 1]
    #[max = 31]
    day: Option<u32>,
) -> Result<(), Error> {
    let Some(user_id) = parse_user_id(ctx, &user_id).await? else {
        return Ok(());
    };
    let author_id = ctx.author().id.get();

    let update = BirthdayUpdate {
        name,
        birth_month: month,
        birth_day: day,
    };
    let result = ctx.data().birthdays.update(author_id, user_id, update).await;
    respond(ctx, result, "Successfully updated birthday entry.").await
}

/// Delete birthday entry
#[poise::command(slash_command)]
pub async fn delete(
    ctx: Context<'_>,
    #[description = "ID of user"] user_id: String,
) -> Result<(), Error> {
    let Some(user_id) = parse_user_id(ctx, &user_id).await? else {
        return Ok(());
    };
    let author_id = ctx.author().id.get();

    let result = ctx.data().birthdays.remove(author_id, user_id).await;
    respond(ctx, result, "Successfully deleted birthday entry.").await
}

/// List birthday entries
#[poise::command(slash_command)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let author = ctx.author();
    let today = chrono::Utc::now().date_naive();

    let entries = ctx.data().birthdays.list(author.id.get(), today).await?;
    let description = format_birthday_list(&author.tag(), &author.name, &entries);

    let embed = serenity::CreateEmbed::new().description(description);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Discord IDs arrive as text so that users outside the server can be added.
async fn respond(ctx: Context<'_>, result: Result<(), BirthdayError>, success: &str) -> Result<(), Error> {
    match result {
        Ok(()) => ctx.say(success).await?,
        Err(BirthdayError::Storage(e)) => return Err(e.into()),
        Err(e) => ctx.say(e.to_string()).await?,
    };
    Ok(())
}

pub fn format_birthday_list(author_tag: &str, author_name: &str, entries: &[BirthdayListEntry]) -> String {
    let mut text = format!("**List of Birthdays**\nAuthor: {}\n\n", author_tag);

    if entries.is_empty() {
        text.push_str(&format!("\n{} has not added any birthdays yet.", author_name));
        return text;
    }

    for (i, entry) in entries.iter().enumerate() {
        let birthday = &entry.birthday;

        if entry.is_today {
            text.push_str(&format!("**Happy Birthday {}!!** 🎉🥳\n", birthday.name));
        }
        if entry.is_next {
            text.push_str("**Next birthday** ⬇️\n");
        }

        text.push_str(&format!(
            "{}. {} born {} of {}\n- Mention: <@{}> | Discord ID: {}\n\n",
            i + 1,
            birthday.name,
            ordinal(birthday.birth_day),
            month_name(birthday.birth_month),
            birthday.user_id,
            birthday.user_id,
        ));
    }

    text
}
