// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "birthdays/sqlite_birthday_store.rs"]
pub mod birthdays;

#[path = "guild_config/sqlite_config_store.rs"]
pub mod guild_config;

#[path = "media/mod.rs"]
pub mod media;

#[path = "trees/sqlite_tree_store.rs"]
pub mod trees;

/// Single-connection in-memory database, so every query sees the same data.
#[cfg(test)]
pub async fn test_pool() -> sqlx::Pool<sqlx::Sqlite> {
    sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite")
}
