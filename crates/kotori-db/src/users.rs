//! Username cache repository.

use crate::Db;
use kotori_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

impl Db {
    /// Remember a user's display name.
    pub async fn upsert_username(&self, user_id: i64, user_name: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (discord_user_id, user_name)
             VALUES (?1, ?2)
             ON CONFLICT(discord_user_id) DO UPDATE SET user_name = excluded.user_name",
        )
        .bind(user_id)
        .bind(user_name)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Cached display name, when known.
    pub async fn cached_username(&self, user_id: i64) -> Result<Option<String>> {
        let row: Option<Option<String>> =
            sqlx::query("SELECT user_name FROM users WHERE discord_user_id = ?1")
                .bind(user_id)
                .map(|row: SqliteRow| row.get("user_name"))
                .fetch_optional(self.pool())
                .await?;
        Ok(row.flatten())
    }
}

#[cfg(test)]
mod tests {
    use crate::Db;

    #[tokio::test]
    async fn test_username_upsert() {
        let db = Db::in_memory().await.unwrap();
        assert_eq!(db.cached_username(1).await.unwrap(), None);

        db.upsert_username(1, "old name").await.unwrap();
        db.upsert_username(1, "new name").await.unwrap();
        assert_eq!(db.cached_username(1).await.unwrap().as_deref(), Some("new name"));
    }
}
