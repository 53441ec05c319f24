//! Sticky message repository.

use crate::Db;
use kotori_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// The sticky state of a channel.
#[derive(Debug, Clone)]
pub struct StickyMessage {
    pub original_message_id: i64,
    pub stickied_message_id: Option<i64>,
}

impl Db {
    /// Sticky state for a channel, when present.
    pub async fn sticky_message(&self, guild_id: i64, channel_id: i64) -> Result<Option<StickyMessage>> {
        let row = sqlx::query(
            "SELECT original_message_id, stickied_message_id
             FROM sticky_messages
             WHERE guild_id = ?1 AND channel_id = ?2",
        )
        .bind(guild_id)
        .bind(channel_id)
        .map(|row: SqliteRow| StickyMessage {
            original_message_id: row.get("original_message_id"),
            stickied_message_id: row.get("stickied_message_id"),
        })
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    /// Set (or refresh) the sticky state of a channel.
    pub async fn upsert_sticky_message(
        &self,
        guild_id: i64,
        channel_id: i64,
        original_message_id: i64,
        stickied_message_id: Option<i64>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO sticky_messages
                 (guild_id, channel_id, original_message_id, stickied_message_id)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (guild_id, channel_id) DO UPDATE SET
                 original_message_id = excluded.original_message_id,
                 stickied_message_id = excluded.stickied_message_id",
        )
        .bind(guild_id)
        .bind(channel_id)
        .bind(original_message_id)
        .bind(stickied_message_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Remove the sticky state of a channel.
    pub async fn delete_sticky_message(&self, guild_id: i64, channel_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM sticky_messages WHERE guild_id = ?1 AND channel_id = ?2")
            .bind(guild_id)
            .bind(channel_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::Db;

    #[tokio::test]
    async fn test_sticky_upsert_per_channel() {
        let db = Db::in_memory().await.unwrap();
        db.upsert_sticky_message(1, 2, 100, Some(200)).await.unwrap();
        db.upsert_sticky_message(1, 2, 100, Some(201)).await.unwrap();

        let sticky = db.sticky_message(1, 2).await.unwrap().unwrap();
        assert_eq!(sticky.original_message_id, 100);
        assert_eq!(sticky.stickied_message_id, Some(201));

        db.delete_sticky_message(1, 2).await.unwrap();
        assert!(db.sticky_message(1, 2).await.unwrap().is_none());
    }
}
