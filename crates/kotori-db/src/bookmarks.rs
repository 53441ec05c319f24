//! Bookmark repository.

use crate::Db;
use kotori_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// One line of the bookmark leaderboard.
#[derive(Debug, Clone)]
pub struct BookmarkedMessage {
    pub channel_id: i64,
    pub message_id: i64,
    pub message_author_id: i64,
    pub message_link: String,
    pub bookmark_count: i64,
}

impl Db {
    /// Record or refresh the counted bookmark total of a message.
    pub async fn update_bookmark_count(
        &self,
        guild_id: i64,
        channel_id: i64,
        message_id: i64,
        message_author_id: i64,
        message_link: &str,
        bookmark_count: i64,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO bookmarked_messages
                 (guild_id, channel_id, message_id, message_author_id, message_link, bookmark_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (guild_id, message_id) DO UPDATE SET
                 bookmark_count = excluded.bookmark_count",
        )
        .bind(guild_id)
        .bind(channel_id)
        .bind(message_id)
        .bind(message_author_id)
        .bind(message_link)
        .bind(bookmark_count)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Record a user's personal bookmark and the DM message that carries it.
    pub async fn insert_user_bookmark(
        &self,
        guild_id: i64,
        channel_id: i64,
        user_id: i64,
        message_id: i64,
        message_link: &str,
        dm_message_id: i64,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_bookmarks
                 (guild_id, channel_id, user_id, message_id, message_link, dm_message_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(guild_id)
        .bind(channel_id)
        .bind(user_id)
        .bind(message_id)
        .bind(message_link)
        .bind(dm_message_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Remove a personal bookmark by the DM message the user reacted on.
    pub async fn delete_user_bookmark(&self, user_id: i64, dm_message_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM user_bookmarks WHERE user_id = ?1 AND dm_message_id = ?2")
            .bind(user_id)
            .bind(dm_message_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Whether a user already bookmarked a message.
    pub async fn bookmark_exists(&self, user_id: i64, message_id: i64) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM user_bookmarks WHERE user_id = ?1 AND message_id = ?2")
            .bind(user_id)
            .bind(message_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.is_some())
    }

    /// Top ten most bookmarked messages of a guild.
    pub async fn top_bookmarks(&self, guild_id: i64) -> Result<Vec<BookmarkedMessage>> {
        let rows = sqlx::query(
            "SELECT channel_id, message_id, message_author_id, message_link, bookmark_count
             FROM bookmarked_messages
             WHERE guild_id = ?1
             ORDER BY bookmark_count DESC
             LIMIT 10",
        )
        .bind(guild_id)
        .map(|row: SqliteRow| BookmarkedMessage {
            channel_id: row.get("channel_id"),
            message_id: row.get("message_id"),
            message_author_id: row.get("message_author_id"),
            message_link: row.get("message_link"),
            bookmark_count: row.get("bookmark_count"),
        })
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Drop a message from the bookmark leaderboard.
    pub async fn delete_bookmarked_message(&self, guild_id: i64, message_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM bookmarked_messages WHERE guild_id = ?1 AND message_id = ?2")
            .bind(guild_id)
            .bind(message_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::Db;

    #[tokio::test]
    async fn test_bookmark_flow() {
        let db = Db::in_memory().await.unwrap();

        assert!(!db.bookmark_exists(10, 100).await.unwrap());
        db.insert_user_bookmark(1, 2, 10, 100, "link", 500).await.unwrap();
        assert!(db.bookmark_exists(10, 100).await.unwrap());

        db.delete_user_bookmark(10, 500).await.unwrap();
        assert!(!db.bookmark_exists(10, 100).await.unwrap());
    }

    #[tokio::test]
    async fn test_leaderboard_counts_and_order() {
        let db = Db::in_memory().await.unwrap();
        db.update_bookmark_count(1, 2, 100, 7, "link-a", 3).await.unwrap();
        db.update_bookmark_count(1, 2, 101, 8, "link-b", 5).await.unwrap();
        // Refresh overwrites the count
        db.update_bookmark_count(1, 2, 100, 7, "link-a", 6).await.unwrap();

        let top = db.top_bookmarks(1).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].message_id, 100);
        assert_eq!(top[0].bookmark_count, 6);

        db.delete_bookmarked_message(1, 100).await.unwrap();
        assert_eq!(db.top_bookmarks(1).await.unwrap().len(), 1);
    }
}
