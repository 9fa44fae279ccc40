use crate::core::trees::{TreeError, TreeMember, TreeMemberUpdate, TreeStore};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteTreeStore {
    pool: Pool<Sqlite>,
}

impl SqliteTreeStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tree_members (
                guild_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                parent_id INTEGER,
                PRIMARY KEY (guild_id, user_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn storage(e: sqlx::Error) -> TreeError {
    TreeError::Storage(e.to_string())
}

fn row_to_member(row: &SqliteRow) -> TreeMember {
    TreeMember {
        guild_id: row.get::<i64, _>("guild_id") as u64,
        user_id: row.get::<i64, _>("user_id") as u64,
        name: row.get("name"),
        parent_id: row.get::<Option<i64>, _>("parent_id").map(|id| id as u64),
    }
}

#[async_trait]
impl TreeStore for SqliteTreeStore {
    async fn get_member(&self, guild_id: u64, user_id: u64) -> Result<Option<TreeMember>, TreeError> {
        let row = sqlx::query("SELECT * FROM tree_members WHERE guild_id = ? AND user_id = ?")
            .bind(guild_id as i64)
            .bind(user_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        Ok(row.as_ref().map(row_to_member))
    }

    async fn insert_member(&self, member: TreeMember) -> Result<(), TreeError> {
        sqlx::query("INSERT INTO tree_members (guild_id, user_id, name, parent_id) VALUES (?, ?, ?, ?)")
            .bind(member.guild_id as i64)
            .bind(member.user_id as i64)
            .bind(&member.name)
            .bind(member.parent_id.map(|id| id as i64))
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn update_member(
        &self,
        guild_id: u64,
        user_id: u64,
        update: TreeMemberUpdate,
    ) -> Result<(), TreeError> {
        sqlx::query(
            r#"
            UPDATE tree_members SET
                name = COALESCE(?, name),
                parent_id = COALESCE(?, parent_id)
            WHERE guild_id = ? AND user_id = ?
            "#,
        )
        .bind(update.name)
        .bind(update.parent_id.map(|id| id as i64))
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn delete_member(&self, guild_id: u64, user_id: u64) -> Result<(), TreeError> {
        sqlx::query("DELETE FROM tree_members WHERE guild_id = ? AND user_id = ?")
            .bind(guild_id as i64)
            .bind(user_id as i64)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn list_members(&self, guild_id: u64) -> Result<Vec<TreeMember>, TreeError> {
        let rows = sqlx::query("SELECT * FROM tree_members WHERE guild_id = ? ORDER BY rowid")
            .bind(guild_id as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        Ok(rows.iter().map(row_to_member).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::test_pool;

    fn member(guild_id: u64, user_id: u64, name: &str, parent_id: Option<u64>) -> TreeMember {
        TreeMember {
            guild_id,
            user_id,
            name: name.to_string(),
            parent_id,
        }
    }

    #[tokio::test]
    async fn test_tree_member_crud_keeps_insertion_order() {
        let store = SqliteTreeStore::new(test_pool().await);
        store.migrate().await.unwrap();

        store.insert_member(member(1, 30, "Root", None)).await.unwrap();
        store.insert_member(member(1, 20, "Second", Some(30))).await.unwrap();
        store.insert_member(member(1, 10, "Third", Some(30))).await.unwrap();
        store.insert_member(member(2, 10, "Elsewhere", None)).await.unwrap();

        let names: Vec<String> = store
            .list_members(1)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["Root", "Second", "Third"]);

        store
            .update_member(
                1,
                10,
                TreeMemberUpdate {
                    name: None,
                    parent_id: Some(20),
                },
            )
            .await
            .unwrap();
        assert_eq!(
            store.get_member(1, 10).await.unwrap(),
            Some(member(1, 10, "Third", Some(20)))
        );

        store.delete_member(1, 10).await.unwrap();
        assert!(store.get_member(1, 10).await.unwrap().is_none());
        assert_eq!(store.list_members(2).await.unwrap().len(), 1);
    }
}
