//! Immersion goal repository.

use crate::Db;
use kotori_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// A goal row.
#[derive(Debug, Clone)]
pub struct Goal {
    pub goal_id: i64,
    pub media_type: String,
    pub goal_type: String,
    pub goal_value: i64,
    pub end_date: String,
}

/// A goal row with its progress computed from the logs table.
#[derive(Debug, Clone)]
pub struct GoalStatus {
    pub goal_id: i64,
    pub goal_type: String,
    pub goal_value: i64,
    pub end_date: String,
    pub created_at: String,
    pub progress: f64,
}

impl Db {
    /// Create a goal. `goal_type` is `points` or `amount` (enforced by the schema).
    pub async fn insert_goal(
        &self,
        user_id: i64,
        media_type: &str,
        goal_type: &str,
        goal_value: i64,
        end_date: &str,
        created_at: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO user_goals (user_id, media_type, goal_type, goal_value, end_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(user_id)
        .bind(media_type)
        .bind(goal_type)
        .bind(goal_value)
        .bind(end_date)
        .bind(created_at)
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// All goals of a user.
    pub async fn user_goals(&self, user_id: i64) -> Result<Vec<Goal>> {
        let rows = sqlx::query(
            "SELECT goal_id, media_type, goal_type, goal_value, end_date
             FROM user_goals
             WHERE user_id = ?1",
        )
        .bind(user_id)
        .map(map_goal)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Delete a goal, scoped to its owner.
    pub async fn delete_goal(&self, goal_id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_goals WHERE goal_id = ?1 AND user_id = ?2")
            .bind(goal_id)
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Goals for one media type with progress summed from the logs table,
    /// counting only logs between goal creation and goal end.
    pub async fn goal_statuses(&self, user_id: i64, media_type: &str) -> Result<Vec<GoalStatus>> {
        let rows = sqlx::query(
            "SELECT goal_id, goal_type, goal_value, end_date, created_at,
                CASE
                    WHEN goal_type = 'points' THEN (
                        SELECT COALESCE(SUM(points_received), 0)
                        FROM logs
                        WHERE user_id = ?1
                          AND media_type = ?2
                          AND log_date BETWEEN user_goals.created_at AND user_goals.end_date)
                    WHEN goal_type = 'amount' THEN (
                        SELECT CAST(COALESCE(SUM(amount_logged), 0) AS REAL)
                        FROM logs
                        WHERE user_id = ?1
                          AND media_type = ?2
                          AND log_date BETWEEN user_goals.created_at AND user_goals.end_date)
                END AS progress
             FROM user_goals
             WHERE user_id = ?1 AND media_type = ?2",
        )
        .bind(user_id)
        .bind(media_type)
        .map(|row: SqliteRow| GoalStatus {
            goal_id: row.get("goal_id"),
            goal_type: row.get("goal_type"),
            goal_value: row.get("goal_value"),
            end_date: row.get("end_date"),
            created_at: row.get("created_at"),
            progress: row.get::<Option<f64>, _>("progress").unwrap_or(0.0),
        })
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Goals that ended before `now`.
    pub async fn expired_goals(&self, user_id: i64, now: &str) -> Result<Vec<Goal>> {
        let rows = sqlx::query(
            "SELECT goal_id, media_type, goal_type, goal_value, end_date
             FROM user_goals
             WHERE user_id = ?1 AND end_date < ?2",
        )
        .bind(user_id)
        .bind(now)
        .map(map_goal)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Delete every expired goal of a user.
    pub async fn delete_expired_goals(&self, user_id: i64, now: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM user_goals WHERE user_id = ?1 AND end_date < ?2")
            .bind(user_id)
            .bind(now)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }
}

fn map_goal(row: SqliteRow) -> Goal {
    Goal {
        goal_id: row.get("goal_id"),
        media_type: row.get("media_type"),
        goal_type: row.get("goal_type"),
        goal_value: row.get("goal_value"),
        end_date: row.get("end_date"),
    }
}

#[cfg(test)]
mod tests {
    use crate::Db;

    #[tokio::test]
    async fn test_goal_progress_window() {
        let db = Db::in_memory().await.unwrap();
        db.insert_goal(1, "Manga", "amount", 100, "2024-03-31 00:00:00", "2024-03-01 00:00:00")
            .await
            .unwrap();

        // Inside the window
        db.insert_log(1, "Manga", None, None, 30, 6.0, "2024-03-10 12:00:00", "Manga")
            .await
            .unwrap();
        // Before the window, must not count
        db.insert_log(1, "Manga", None, None, 50, 10.0, "2024-02-10 12:00:00", "Manga")
            .await
            .unwrap();
        // Different media type, must not count
        db.insert_log(1, "Anime", None, None, 3, 39.0, "2024-03-10 13:00:00", "Anime")
            .await
            .unwrap();

        let statuses = db.goal_statuses(1, "Manga").await.unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].progress, 30.0);
    }

    #[tokio::test]
    async fn test_points_goal_progress() {
        let db = Db::in_memory().await.unwrap();
        db.insert_goal(1, "Anime", "points", 50, "2024-03-31 00:00:00", "2024-03-01 00:00:00")
            .await
            .unwrap();
        db.insert_log(1, "Anime", None, None, 2, 26.0, "2024-03-05 12:00:00", "Anime")
            .await
            .unwrap();

        let statuses = db.goal_statuses(1, "Anime").await.unwrap();
        assert_eq!(statuses[0].progress, 26.0);
    }

    #[tokio::test]
    async fn test_expired_goal_cleanup() {
        let db = Db::in_memory().await.unwrap();
        db.insert_goal(1, "Manga", "amount", 10, "2024-01-01 00:00:00", "2023-12-01 00:00:00")
            .await
            .unwrap();
        db.insert_goal(1, "Manga", "amount", 10, "2030-01-01 00:00:00", "2024-01-01 00:00:00")
            .await
            .unwrap();

        let now = "2024-06-01 00:00:00";
        assert_eq!(db.expired_goals(1, now).await.unwrap().len(), 1);
        assert_eq!(db.delete_expired_goals(1, now).await.unwrap(), 1);
        assert_eq!(db.user_goals(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_goal_scoped_to_owner() {
        let db = Db::in_memory().await.unwrap();
        let id = db
            .insert_goal(1, "Manga", "amount", 10, "2030-01-01 00:00:00", "2024-01-01 00:00:00")
            .await
            .unwrap();
        assert!(!db.delete_goal(id, 2).await.unwrap());
        assert!(db.delete_goal(id, 1).await.unwrap());
    }
}
