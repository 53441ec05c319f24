//! Selfmute repository.

use crate::Db;
use kotori_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// An active selfmute.
#[derive(Debug, Clone)]
pub struct ActiveMute {
    pub guild_id: i64,
    pub user_id: i64,
    pub mute_role_id: i64,
    pub roles_to_restore: String,
    pub end_time: String,
}

impl Db {
    /// Store (or refresh) a selfmute together with the roles to restore.
    pub async fn store_mute(
        &self,
        guild_id: i64,
        user_id: i64,
        mute_role_id: i64,
        roles_to_restore: &str,
        end_time: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO active_mutes (guild_id, user_id, mute_role_id, roles_to_restore, end_time)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (guild_id, user_id) DO UPDATE SET
                 mute_role_id = excluded.mute_role_id,
                 roles_to_restore = excluded.roles_to_restore,
                 end_time = excluded.end_time",
        )
        .bind(guild_id)
        .bind(user_id)
        .bind(mute_role_id)
        .bind(roles_to_restore)
        .bind(end_time)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// One user's active mute, when present.
    pub async fn user_mute(&self, guild_id: i64, user_id: i64) -> Result<Option<ActiveMute>> {
        let row = sqlx::query(
            "SELECT guild_id, user_id, mute_role_id, roles_to_restore, end_time
             FROM active_mutes
             WHERE guild_id = ?1 AND user_id = ?2",
        )
        .bind(guild_id)
        .bind(user_id)
        .map(map_mute)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    /// Mutes whose end time has passed.
    pub async fn expired_mutes(&self, now: &str) -> Result<Vec<ActiveMute>> {
        let rows = sqlx::query(
            "SELECT guild_id, user_id, mute_role_id, roles_to_restore, end_time
             FROM active_mutes
             WHERE end_time <= ?1
             ORDER BY end_time ASC",
        )
        .bind(now)
        .map(map_mute)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Forget a mute.
    pub async fn remove_mute(&self, guild_id: i64, user_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM active_mutes WHERE guild_id = ?1 AND user_id = ?2")
            .bind(guild_id)
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

fn map_mute(row: SqliteRow) -> ActiveMute {
    ActiveMute {
        guild_id: row.get("guild_id"),
        user_id: row.get("user_id"),
        mute_role_id: row.get("mute_role_id"),
        roles_to_restore: row.get("roles_to_restore"),
        end_time: row.get("end_time"),
    }
}

#[cfg(test)]
mod tests {
    use crate::Db;

    #[tokio::test]
    async fn test_mute_lifecycle() {
        let db = Db::in_memory().await.unwrap();
        db.store_mute(1, 7, 55, "10,20", "2024-03-01 12:00:00").await.unwrap();
        // Re-muting replaces the previous entry
        db.store_mute(1, 7, 56, "10", "2024-03-02 12:00:00").await.unwrap();

        let mute = db.user_mute(1, 7).await.unwrap().unwrap();
        assert_eq!(mute.mute_role_id, 56);
        assert_eq!(mute.roles_to_restore, "10");

        assert!(db.expired_mutes("2024-03-01 00:00:00").await.unwrap().is_empty());
        assert_eq!(db.expired_mutes("2024-03-02 12:00:00").await.unwrap().len(), 1);

        db.remove_mute(1, 7).await.unwrap();
        assert!(db.user_mute(1, 7).await.unwrap().is_none());
    }
}
