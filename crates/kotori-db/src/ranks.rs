//! Saved rank repository.

use crate::Db;
use kotori_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

impl Db {
    /// Save (or replace) a member's role id list.
    pub async fn save_user_ranks(&self, guild_id: i64, user_id: i64, role_ids: &str) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO user_ranks (guild_id, discord_user_id, role_ids)
             VALUES (?1, ?2, ?3)",
        )
        .bind(guild_id)
        .bind(user_id)
        .bind(role_ids)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Saved role id list for a member, when present.
    pub async fn saved_user_ranks(&self, guild_id: i64, user_id: i64) -> Result<Option<String>> {
        let row: Option<String> = sqlx::query(
            "SELECT role_ids FROM user_ranks WHERE guild_id = ?1 AND discord_user_id = ?2",
        )
        .bind(guild_id)
        .bind(user_id)
        .map(|row: SqliteRow| row.get("role_ids"))
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use crate::Db;

    #[tokio::test]
    async fn test_rank_save_replaces() {
        let db = Db::in_memory().await.unwrap();
        db.save_user_ranks(1, 7, "10,20").await.unwrap();
        db.save_user_ranks(1, 7, "10,20,30").await.unwrap();
        assert_eq!(db.saved_user_ranks(1, 7).await.unwrap().as_deref(), Some("10,20,30"));
        assert!(db.saved_user_ranks(1, 8).await.unwrap().is_none());
    }
}
