// Discord layer - commands, event handlers and scheduled tasks.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "events/member_join.rs"]
pub mod events;

#[path = "tasks/birthday_reminders.rs"]
pub mod tasks;

use crate::core::birthdays::BirthdayService;
use crate::core::guild_config::GuildConfigService;
use crate::core::trees::{TreeRenderer, TreeService};
use crate::infra::birthdays::SqliteBirthdayStore;
use crate::infra::guild_config::SqliteGuildConfigStore;
use crate::infra::media::MediaFetcher;
use crate::infra::trees::SqliteTreeStore;
use std::path::PathBuf;
use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Reply used whenever a command fails for a reason the user can't fix.
pub const GENERIC_ERROR: &str = "An unknown error occurred, please try again.";

/// Shared state handed to every command and event handler.
pub struct Data {
    pub config: Arc<GuildConfigService<SqliteGuildConfigStore>>,
    pub birthdays: Arc<BirthdayService<SqliteBirthdayStore>>,
    pub trees: Arc<TreeService<SqliteTreeStore>>,
    pub renderer: Arc<TreeRenderer>,
    pub media: Arc<MediaFetcher>,
    /// When set, every rendered chart is also saved here.
    pub tree_archive: Option<PathBuf>,
}
