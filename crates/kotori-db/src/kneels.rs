//! Kneel leaderboard repository.

use crate::Db;
use kotori_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// One line of the kneel leaderboard.
#[derive(Debug, Clone)]
pub struct KneelEntry {
    pub user_id: i64,
    pub user_name: Option<String>,
    pub total_score: i64,
}

impl Db {
    /// Record the current kneel count of a message.
    pub async fn upsert_kneel_score(
        &self,
        guild_id: i64,
        message_id: i64,
        user_id: i64,
        score: i64,
        user_name: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO kneels (guild_id, message_id, discord_user_id, kneel_score, user_name)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (guild_id, message_id) DO UPDATE SET
                 kneel_score = excluded.kneel_score,
                 user_name = excluded.user_name",
        )
        .bind(guild_id)
        .bind(message_id)
        .bind(user_id)
        .bind(score)
        .bind(user_name)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Total kneels collected by one user in a guild.
    pub async fn user_kneels(&self, guild_id: i64, user_id: i64) -> Result<i64> {
        let total: Option<i64> = sqlx::query(
            "SELECT SUM(kneel_score) AS total
             FROM kneels
             WHERE guild_id = ?1 AND discord_user_id = ?2",
        )
        .bind(guild_id)
        .bind(user_id)
        .map(|row: SqliteRow| row.get("total"))
        .fetch_one(self.pool())
        .await?;
        Ok(total.unwrap_or(0))
    }

    /// Top twenty kneel collectors of a guild.
    pub async fn top_kneels(&self, guild_id: i64) -> Result<Vec<KneelEntry>> {
        let rows = sqlx::query(
            "SELECT discord_user_id, user_name, SUM(kneel_score) AS total
             FROM kneels
             WHERE guild_id = ?1
             GROUP BY discord_user_id
             ORDER BY total DESC
             LIMIT 20",
        )
        .bind(guild_id)
        .map(|row: SqliteRow| KneelEntry {
            user_id: row.get("discord_user_id"),
            user_name: row.get("user_name"),
            total_score: row.get::<Option<i64>, _>("total").unwrap_or(0),
        })
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Refresh a user's stored display name across their kneel rows.
    pub async fn update_kneel_username(&self, user_id: i64, user_name: &str) -> Result<()> {
        sqlx::query("UPDATE kneels SET user_name = ?1 WHERE discord_user_id = ?2")
            .bind(user_name)
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::Db;

    #[tokio::test]
    async fn test_kneel_scores_aggregate_per_user() {
        let db = Db::in_memory().await.unwrap();
        db.upsert_kneel_score(1, 100, 7, 3, "alice").await.unwrap();
        db.upsert_kneel_score(1, 101, 7, 2, "alice").await.unwrap();
        db.upsert_kneel_score(1, 102, 8, 4, "bob").await.unwrap();
        // Recount replaces the per-message score
        db.upsert_kneel_score(1, 100, 7, 5, "alice").await.unwrap();

        assert_eq!(db.user_kneels(1, 7).await.unwrap(), 7);
        let top = db.top_kneels(1).await.unwrap();
        assert_eq!(top[0].user_id, 7);
        assert_eq!(top[0].total_score, 7);
        assert_eq!(top[1].user_id, 8);
    }

    #[tokio::test]
    async fn test_username_refresh() {
        let db = Db::in_memory().await.unwrap();
        db.upsert_kneel_score(1, 100, 7, 1, "old").await.unwrap();
        db.update_kneel_username(7, "new").await.unwrap();
        let top = db.top_kneels(1).await.unwrap();
        assert_eq!(top[0].user_name.as_deref(), Some("new"));
    }
}
