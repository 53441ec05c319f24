//! Auto-receive role repository.

use crate::Db;
use kotori_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// A source/target role pair: holders of `role_to_have` receive `role_to_get`.
#[derive(Debug, Clone)]
pub struct AutoReceivePair {
    pub role_id_to_have: i64,
    pub role_id_to_get: i64,
}

/// A user banned from receiving one specific role.
#[derive(Debug, Clone)]
pub struct AutoReceiveBan {
    pub user_id: i64,
    pub role_id: i64,
}

impl Db {
    /// Auto-receive pairs configured for a guild.
    pub async fn auto_receive_pairs(&self, guild_id: i64) -> Result<Vec<AutoReceivePair>> {
        let rows = sqlx::query(
            "SELECT role_id_to_have, role_id_to_get FROM auto_receive_roles WHERE guild_id = ?1",
        )
        .bind(guild_id)
        .map(|row: SqliteRow| AutoReceivePair {
            role_id_to_have: row.get("role_id_to_have"),
            role_id_to_get: row.get("role_id_to_get"),
        })
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Add a pair. Returns `false` when the pair already existed.
    pub async fn add_auto_receive_pair(
        &self,
        guild_id: i64,
        role_id_to_have: i64,
        role_name_to_have: &str,
        role_id_to_get: i64,
        role_name_to_get: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO auto_receive_roles
                 (guild_id, role_id_to_have, role_name_to_have, role_id_to_get, role_name_to_get)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(guild_id)
        .bind(role_id_to_have)
        .bind(role_name_to_have)
        .bind(role_id_to_get)
        .bind(role_name_to_get)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a pair.
    pub async fn remove_auto_receive_pair(
        &self,
        guild_id: i64,
        role_id_to_have: i64,
        role_id_to_get: i64,
    ) -> Result<()> {
        sqlx::query(
            "DELETE FROM auto_receive_roles
             WHERE guild_id = ?1 AND role_id_to_have = ?2 AND role_id_to_get = ?3",
        )
        .bind(guild_id)
        .bind(role_id_to_have)
        .bind(role_id_to_get)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Users banned from auto-receiving in a guild.
    pub async fn auto_receive_bans(&self, guild_id: i64) -> Result<Vec<AutoReceiveBan>> {
        let rows = sqlx::query(
            "SELECT user_id, role_id FROM auto_receive_roles_banned WHERE guild_id = ?1",
        )
        .bind(guild_id)
        .map(|row: SqliteRow| AutoReceiveBan {
            user_id: row.get("user_id"),
            role_id: row.get("role_id"),
        })
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Ban a user from auto-receiving one role. Returns `false` when
    /// the ban already existed.
    pub async fn ban_auto_receive(
        &self,
        guild_id: i64,
        user_id: i64,
        user_name: &str,
        role_id: i64,
        role_name: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO auto_receive_roles_banned
                 (guild_id, user_id, user_name, role_id, role_name)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(guild_id)
        .bind(user_id)
        .bind(user_name)
        .bind(role_id)
        .bind(role_name)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Lift every auto-receive ban of a user.
    pub async fn unban_auto_receive(&self, guild_id: i64, user_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM auto_receive_roles_banned WHERE guild_id = ?1 AND user_id = ?2")
            .bind(guild_id)
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
    async fn test_pair_dedup() {
        let db = Db::in_memory().await.unwrap();
        assert!(db.add_auto_receive_pair(1, 10, "a", 20, "b").await.unwrap());
        assert!(!db.add_auto_receive_pair(1, 10, "a", 20, "b").await.unwrap());
        assert_eq!(db.auto_receive_pairs(1).await.unwrap().len(), 1);

        db.remove_auto_receive_pair(1, 10, 20).await.unwrap();
        assert!(db.auto_receive_pairs(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ban_and_unban() {
        let db = Db::in_memory().await.unwrap();
        assert!(db.ban_auto_receive(1, 7, "alice", 20, "b").await.unwrap());
        assert!(!db.ban_auto_receive(1, 7, "alice", 20, "b").await.unwrap());
        assert!(db.ban_auto_receive(1, 7, "alice", 21, "c").await.unwrap());

        db.unban_auto_receive(1, 7).await.unwrap();
        assert!(db.auto_receive_bans(1).await.unwrap().is_empty());
    }
}
