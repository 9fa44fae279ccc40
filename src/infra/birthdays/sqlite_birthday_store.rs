use crate::core::birthdays::{Birthday, BirthdayError, BirthdayStore, BirthdayUpdate};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteBirthdayStore {
    pool: Pool<Sqlite>,
}

impl SqliteBirthdayStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS birthdays (
                author_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                birth_month INTEGER NOT NULL,
                birth_day INTEGER NOT NULL,
                PRIMARY KEY (author_id, user_id)
            );
            CREATE INDEX IF NOT EXISTS idx_birthdays_date
                ON birthdays(birth_month, birth_day);
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn storage(e: sqlx::Error) -> BirthdayError {
    BirthdayError::Storage(e.to_string())
}

fn row_to_birthday(row: &SqliteRow) -> Birthday {
    Birthday {
        author_id: row.get::<i64, _>("author_id") as u64,
        user_id: row.get::<i64, _>("user_id") as u64,
        name: row.get("name"),
        birth_month: row.get::<i64, _>("birth_month") as u32,
        birth_day: row.get::<i64, _>("birth_day") as u32,
    }
}

#[async_trait]
impl BirthdayStore for SqliteBirthdayStore {
    async fn get(&self, author_id: u64, user_id: u64) -> Result<Option<Birthday>, BirthdayError> {
        let row = sqlx::query("SELECT * FROM birthdays WHERE author_id = ? AND user_id = ?")
            .bind(author_id as i64)
            .bind(user_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        Ok(row.as_ref().map(row_to_birthday))
    }

    async fn insert(&self, birthday: Birthday) -> Result<(), BirthdayError> {
        sqlx::query(
            "INSERT INTO birthdays (author_id, user_id, name, birth_month, birth_day) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(birthday.author_id as i64)
        .bind(birthday.user_id as i64)
        .bind(&birthday.name)
        .bind(birthday.birth_month as i64)
        .bind(birthday.birth_day as i64)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn update(
        &self,
        author_id: u64,
        user_id: u64,
        update: BirthdayUpdate,
    ) -> Result<(), BirthdayError> {
        // COALESCE keeps the stored value for every field left out of the update.
        sqlx::query(
            r#"
            UPDATE birthdays SET
                name = COALESCE(?, name),
                birth_month = COALESCE(?, birth_month),
                birth_day = COALESCE(?, birth_day)
            WHERE author_id = ? AND user_id = ?
            "#,
        )
        .bind(update.name)
        .bind(update.birth_month.map(|m| m as i64))
        .bind(update.birth_day.map(|d| d as i64))
        .bind(author_id as i64)
        .bind(user_id as i64)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn delete(&self, author_id: u64, user_id: u64) -> Result<(), BirthdayError> {
        sqlx::query("DELETE FROM birthdays WHERE author_id = ? AND user_id = ?")
            .bind(author_id as i64)
            .bind(user_id as i64)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn list_by_author(&self, author_id: u64) -> Result<Vec<Birthday>, BirthdayError> {
        let rows = sqlx::query("SELECT * FROM birthdays WHERE author_id = ? ORDER BY rowid")
            .bind(author_id as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        Ok(rows.iter().map(row_to_birthday).collect())
    }

    async fn list_on_date(&self, month: u32, day: u32) -> Result<Vec<Birthday>, BirthdayError> {
        let rows = sqlx::query(
            "SELECT * FROM birthdays WHERE birth_month = ? AND birth_day = ? ORDER BY rowid",
        )
        .bind(month as i64)
        .bind(day as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        Ok(rows.iter().map(row_to_birthday).collect())
    }
}
