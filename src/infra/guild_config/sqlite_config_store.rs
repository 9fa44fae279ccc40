use crate::core::guild_config::{ConfigError, GuildConfig, GuildConfigStore};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteGuildConfigStore {
    pool: Pool<Sqlite>,
}

impl SqliteGuildConfigStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS guild_config (
                guild_id INTEGER PRIMARY KEY,
                welcome_message TEXT NOT NULL DEFAULT '',
                welcome_message_attachment_url TEXT NOT NULL DEFAULT '',
                welcome_channel_id INTEGER,
                pins_channel_id INTEGER
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl GuildConfigStore for SqliteGuildConfigStore {
    async fn get_config(&self, guild_id: u64) -> Result<Option<GuildConfig>, ConfigError> {
        let row = sqlx::query("SELECT * FROM guild_config WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ConfigError::Storage(e.to_string()))?;

        Ok(row.map(|row| GuildConfig {
            guild_id,
            welcome_message: row.get("welcome_message"),
            welcome_message_attachment_url: row.get("welcome_message_attachment_url"),
            welcome_channel_id: row
                .get::<Option<i64>, _>("welcome_channel_id")
                .map(|id| id as u64),
            pins_channel_id: row
                .get::<Option<i64>, _>("pins_channel_id")
                .map(|id| id as u64),
        }))
    }

    async fn save_config(&self, config: GuildConfig) -> Result<(), ConfigError> {
        sqlx::query(
            r#"
            INSERT INTO guild_config (
                guild_id, welcome_message, welcome_message_attachment_url,
                welcome_channel_id, pins_channel_id
            )
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET
                welcome_message = excluded.welcome_message,
                welcome_message_attachment_url = excluded.welcome_message_attachment_url,
                welcome_channel_id = excluded.welcome_channel_id,
                pins_channel_id = excluded.pins_channel_id
            "#,
        )
        .bind(config.guild_id as i64)
        .bind(&config.welcome_message)
        .bind(&config.welcome_message_attachment_url)
        .bind(config.welcome_channel_id.map(|id| id as i64))
        .bind(config.pins_channel_id.map(|id| id as i64))
        .execute(&self.pool)
        .await
        .map_err(|e| ConfigError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::test_pool;

    #[tokio::test]
    async fn test_config_round_trip_and_upsert() {
        let store = SqliteGuildConfigStore::new(test_pool().await);
        store.migrate().await.unwrap();

        assert!(store.get_config(1).await.unwrap().is_none());

        let mut config = GuildConfig::new(1);
        config.welcome_message = "Hi <@USER_ID>".to_string();
        config.welcome_channel_id = Some(1_234_567_890_123_456_789);
        store.save_config(config.clone()).await.unwrap();
        assert_eq!(store.get_config(1).await.unwrap(), Some(config.clone()));

        config.pins_channel_id = Some(55);
        config.welcome_channel_id = None;
        store.save_config(config.clone()).await.unwrap();
        assert_eq!(store.get_config(1).await.unwrap(), Some(config));
    }
}
