// This is the entry point of the Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (databases, HTTP, files)
// - `discord/` = Discord-specific adapters (commands, events, tasks)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands, event handlers and the daily birthday check

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::birthdays::BirthdayService;
use crate::core::guild_config::GuildConfigService;
use crate::core::trees::{TreeRenderer, TreeService};
use crate::discord::tasks::{self as birthday_reminders, ReminderSchedule};
use crate::discord::{Data, Error, GENERIC_ERROR};
use crate::infra::birthdays::SqliteBirthdayStore;
use crate::infra::guild_config::SqliteGuildConfigStore;
use crate::infra::media::{MediaFetcher, PngFileSink};
use crate::infra::trees::SqliteTreeStore;
use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/kodachi.db?mode=rwc";

/// Event handler for non-command Discord events.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            tracing::info!(
                user = %data_about_bot.user.name,
                guilds = data_about_bot.guilds.len(),
                "Connected to Discord"
            );
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            if let Err(e) = discord::events::handle_member_join(ctx, data, new_member).await {
                tracing::error!(
                    guild_id = new_member.guild_id.get(),
                    "Error sending welcome message: {}",
                    e
                );
            }
        }
        _ => {}
    }

    Ok(())
}

/// Commands that fail unexpectedly get a generic reply; everything else
/// (permission checks, argument parsing) goes through poise's defaults.
async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!(
                command = %ctx.command().qualified_name,
                user_id = ctx.author().id.get(),
                "Command failed: {}",
                error
            );
            if let Err(e) = ctx.say(GENERIC_ERROR).await {
                tracing::warn!("Failed to report command error: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                tracing::error!("Error while handling error: {}", e);
            }
        }
    }
}

/// Reads a boolean flag, accepting the usual spellings.
fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            other => {
                tracing::warn!("Ignoring invalid {}={:?}, using {}", name, other, default);
                default
            }
        },
        Err(_) => default,
    }
}

fn reminder_schedule_from_env() -> ReminderSchedule {
    let mut schedule = ReminderSchedule::default();

    if let Ok(raw) = std::env::var("BIRTHDAY_CHECK_HOUR") {
        match raw.trim().parse::<u32>() {
            Ok(hour) if hour < 24 => schedule.hour = hour,
            _ => tracing::warn!("Ignoring invalid BIRTHDAY_CHECK_HOUR={:?}", raw),
        }
    }

    if let Ok(raw) = std::env::var("BIRTHDAY_TIMEZONE") {
        match raw.trim().parse::<chrono_tz::Tz>() {
            Ok(timezone) => schedule.timezone = timezone,
            Err(e) => tracing::warn!("Ignoring invalid BIRTHDAY_TIMEZONE={:?}: {}", raw, e),
        }
    }

    schedule
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Initialize logging so we can see what's happening. RUST_LOG overrides
    // the default level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Get Discord bot token from environment
    let token = std::env::var("DISCORD_TOKEN").context(
        "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
    )?;

    // Keep the default database in a dedicated folder so the repo root stays tidy.
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            std::fs::create_dir_all("data").context("Failed to create data directory")?;
            DEFAULT_DATABASE_URL.to_string()
        }
    };

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&database_url)
        .await
        .with_context(|| format!("Failed to connect to {}", database_url))?;

    let config_store = SqliteGuildConfigStore::new(pool.clone());
    config_store.migrate().await.context("Failed to migrate config table")?;
    let config_service = Arc::new(GuildConfigService::new(config_store));

    let birthday_store = SqliteBirthdayStore::new(pool.clone());
    birthday_store.migrate().await.context("Failed to migrate birthdays table")?;
    let birthday_service = Arc::new(BirthdayService::new(birthday_store));

    let tree_store = SqliteTreeStore::new(pool);
    tree_store.migrate().await.context("Failed to migrate tree table")?;
    let tree_service = Arc::new(TreeService::new(tree_store));

    let renderer = match std::env::var("TREE_FONT_PATH") {
        Ok(path) => TreeRenderer::with_font_file(PathBuf::from(path).as_path())?,
        Err(_) => TreeRenderer::new(),
    };

    let tree_archive = match std::env::var("TREE_ARCHIVE_DIR") {
        Ok(dir) => {
            let sink = PngFileSink::new(dir).context("Failed to create tree archive directory")?;
            tracing::info!(dir = %sink.dir().display(), "Archiving rendered tree charts");
            Some(sink.dir().to_path_buf())
        }
        Err(_) => None,
    };

    let media = MediaFetcher::new().context("Failed to create HTTP client")?;
    let register_commands = env_flag("REGISTER_COMMANDS", true);
    let schedule = reminder_schedule_from_env();

    // Create the data structure that will be shared across all commands
    let data = Data {
        config: config_service,
        birthdays: Arc::clone(&birthday_service),
        trees: tree_service,
        renderer: Arc::new(renderer),
        media: Arc::new(media),
        tree_archive,
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILDS | serenity::GatewayIntents::GUILD_MEMBERS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: discord::commands::all(),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                if register_commands {
                    // Global registration can take a while to propagate.
                    poise::builtins::register_globally(ctx, &framework.options().commands)
                        .await?;
                    tracing::info!(
                        count = framework.options().commands.len(),
                        "Registered application commands"
                    );
                }

                birthday_reminders::spawn(ctx.http.clone(), birthday_service, schedule);

                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .context("Error creating client")?;

    client.start().await.context("Error running bot")?;
    Ok(())
}
