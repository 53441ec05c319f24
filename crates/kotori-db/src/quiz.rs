//! Quiz attempt and pass repository.

use crate::Db;
use kotori_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

impl Db {
    /// Record a quiz attempt and its outcome.
    pub async fn add_quiz_attempt(
        &self,
        guild_id: i64,
        user_id: i64,
        quiz_name: &str,
        created_at: &str,
        passed: bool,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO quiz_attempts (guild_id, user_id, quiz_name, created_at, result)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(guild_id)
        .bind(user_id)
        .bind(quiz_name)
        .bind(created_at)
        .bind(passed as i64)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Record a passed quiz; already-recorded passes are kept as-is.
    pub async fn add_passed_quiz(&self, guild_id: i64, user_id: i64, quiz_name: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO passed_quizzes (guild_id, user_id, quiz_name)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(guild_id, user_id, quiz_name) DO NOTHING",
        )
        .bind(guild_id)
        .bind(user_id)
        .bind(quiz_name)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Names of every quiz a user has passed in a guild.
    pub async fn passed_quizzes(&self, guild_id: i64, user_id: i64) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT quiz_name FROM passed_quizzes WHERE guild_id = ?1 AND user_id = ?2",
        )
        .bind(guild_id)
        .bind(user_id)
        .map(|row: SqliteRow| row.get::<String, _>("quiz_name"))
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use crate::Db;

    #[tokio::test]
    async fn test_passes_dedupe() {
        let db = Db::in_memory().await.unwrap();
        db.add_passed_quiz(1, 7, "N5").await.unwrap();
        db.add_passed_quiz(1, 7, "N5").await.unwrap();
        db.add_passed_quiz(1, 7, "N4").await.unwrap();

        let passed = db.passed_quizzes(1, 7).await.unwrap();
        assert_eq!(passed.len(), 2);
        assert!(passed.contains(&"N5".to_string()));
    }

    #[tokio::test]
    async fn test_attempts_recorded() {
        let db = Db::in_memory().await.unwrap();
        db.add_quiz_attempt(1, 7, "N5", "2024-03-01 00:00:00", false)
            .await
            .unwrap();
        db.add_quiz_attempt(1, 7, "N5", "2024-03-02 00:00:00", true)
            .await
            .unwrap();
        // Attempts do not imply passes
        assert!(db.passed_quizzes(1, 7).await.unwrap().is_empty());
    }
}
