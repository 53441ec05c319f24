//! Scheduled event role repository.

use crate::Db;
use kotori_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// A role tracked for a scheduled event.
#[derive(Debug, Clone)]
pub struct EventRole {
    pub guild_id: i64,
    pub event_id: i64,
    pub role_id: i64,
}

impl Db {
    /// Track (or replace) the role created for an event.
    pub async fn upsert_event_role(&self, guild_id: i64, event_id: i64, role_id: i64) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO event_roles (guild_id, event_id, role_id)
             VALUES (?1, ?2, ?3)",
        )
        .bind(guild_id)
        .bind(event_id)
        .bind(role_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// All tracked event roles, across guilds.
    pub async fn all_event_roles(&self) -> Result<Vec<EventRole>> {
        let rows = sqlx::query("SELECT guild_id, event_id, role_id FROM event_roles")
            .map(|row: SqliteRow| EventRole {
                guild_id: row.get("guild_id"),
                event_id: row.get("event_id"),
                role_id: row.get("role_id"),
            })
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }

    /// Role tracked for one event, when present.
    pub async fn event_role(&self, guild_id: i64, event_id: i64) -> Result<Option<i64>> {
        let row: Option<i64> = sqlx::query(
            "SELECT role_id FROM event_roles WHERE guild_id = ?1 AND event_id = ?2",
        )
        .bind(guild_id)
        .bind(event_id)
        .map(|row: SqliteRow| row.get("role_id"))
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    /// Forget an event role.
    pub async fn delete_event_role(&self, guild_id: i64, event_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM event_roles WHERE guild_id = ?1 AND event_id = ?2")
            .bind(guild_id)
            .bind(event_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::Db;

    #[tokio::test]
    async fn test_event_role_tracking() {
        let db = Db::in_memory().await.unwrap();
        db.upsert_event_role(1, 100, 55).await.unwrap();
        db.upsert_event_role(1, 100, 56).await.unwrap();

        assert_eq!(db.event_role(1, 100).await.unwrap(), Some(56));
        assert_eq!(db.all_event_roles().await.unwrap().len(), 1);

        db.delete_event_role(1, 100).await.unwrap();
        assert_eq!(db.event_role(1, 100).await.unwrap(), None);
    }
}
