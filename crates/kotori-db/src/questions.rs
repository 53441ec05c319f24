//! Daily question repository.

use crate::Db;
use kotori_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

impl Db {
    /// The ten most recent questions posted in a channel, newest first.
    pub async fn recent_questions(&self, guild_id: i64, channel_id: i64) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT question FROM daily_questions
             WHERE guild_id = ?1 AND channel_id = ?2
             ORDER BY created_at DESC LIMIT 10",
        )
        .bind(guild_id)
        .bind(channel_id)
        .map(|row: SqliteRow| row.get::<String, _>("question"))
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Whether a question was already posted today (`date` is `YYYY-MM-DD`).
    pub async fn question_posted_on(
        &self,
        guild_id: i64,
        channel_id: i64,
        date: &str,
    ) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM daily_questions
             WHERE guild_id = ?1 AND channel_id = ?2 AND date(created_at) = ?3
             LIMIT 1",
        )
        .bind(guild_id)
        .bind(channel_id)
        .bind(date)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.is_some())
    }

    /// Record a posted question.
    pub async fn insert_question(
        &self,
        guild_id: i64,
        channel_id: i64,
        question: &str,
        created_at: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO daily_questions (guild_id, channel_id, question, created_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(guild_id)
        .bind(channel_id)
        .bind(question)
        .bind(created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::Db;

    #[tokio::test]
    async fn test_daily_question_dedupe_by_date() {
        let db = Db::in_memory().await.unwrap();
        assert!(!db.question_posted_on(1, 2, "2024-03-01").await.unwrap());

        db.insert_question(1, 2, "好きな季節は？", "2024-03-01 09:00:00")
            .await
            .unwrap();
        assert!(db.question_posted_on(1, 2, "2024-03-01").await.unwrap());
        assert!(!db.question_posted_on(1, 2, "2024-03-02").await.unwrap());
    }

    #[tokio::test]
    async fn test_recent_questions_order_and_limit() {
        let db = Db::in_memory().await.unwrap();
        for i in 0..12 {
            db.insert_question(1, 2, &format!("q{i}"), &format!("2024-03-{:02} 09:00:00", i + 1))
                .await
                .unwrap();
        }
        let recent = db.recent_questions(1, 2).await.unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0], "q11");
    }
}
