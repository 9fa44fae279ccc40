// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "birthdays/mod.rs"]
pub mod birthdays;

#[path = "guild_config/mod.rs"]
pub mod guild_config;

#[path = "trees/mod.rs"]
pub mod trees;
