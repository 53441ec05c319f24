//! Immersion log repository.

use crate::Db;
use kotori_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// A log entry as shown in undo autocomplete.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub log_id: i64,
    pub media_type: String,
    pub media_name: Option<String>,
    pub amount_logged: i64,
    pub log_date: String,
}

/// A full log row for export.
#[derive(Debug, Clone)]
pub struct ExportEntry {
    pub log_id: i64,
    pub media_type: String,
    pub media_name: Option<String>,
    pub comment: Option<String>,
    pub amount_logged: i64,
    pub points_received: f64,
    pub log_date: String,
}

/// A log row reduced to what stats and races need.
#[derive(Debug, Clone)]
pub struct PeriodEntry {
    pub user_id: i64,
    pub media_type: String,
    pub amount_logged: i64,
    pub points_received: f64,
    pub log_date: String,
}

/// One leaderboard line: user, summed points, summed amount.
#[derive(Debug, Clone)]
pub struct LeaderboardEntry {
    pub user_id: i64,
    pub total_points: f64,
    pub total_amount: i64,
}

impl Db {
    /// Insert a log entry; returns the new log id.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_log(
        &self,
        user_id: i64,
        media_type: &str,
        media_name: Option<&str>,
        comment: Option<&str>,
        amount: i64,
        points: f64,
        log_date: &str,
        achievement_group: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO logs (user_id, media_type, media_name, comment, amount_logged,
                               points_received, log_date, achievement_group)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(user_id)
        .bind(media_type)
        .bind(media_name)
        .bind(comment)
        .bind(amount)
        .bind(points)
        .bind(log_date)
        .bind(achievement_group)
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// A user's logs, newest first.
    pub async fn user_logs(&self, user_id: i64) -> Result<Vec<LogEntry>> {
        let rows = sqlx::query(
            "SELECT log_id, media_type, media_name, amount_logged, log_date
             FROM logs
             WHERE user_id = ?1
             ORDER BY log_date DESC",
        )
        .bind(user_id)
        .map(|row: SqliteRow| LogEntry {
            log_id: row.get("log_id"),
            media_type: row.get("media_type"),
            media_name: row.get("media_name"),
            amount_logged: row.get("amount_logged"),
            log_date: row.get("log_date"),
        })
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Delete a log entry, scoped to its owner. Returns whether a row went away.
    pub async fn delete_log(&self, log_id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM logs WHERE log_id = ?1 AND user_id = ?2")
            .bind(log_id)
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Distinct log dates for a user, newest first (`YYYY-MM-DD`).
    pub async fn distinct_log_dates(&self, user_id: i64) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT DISTINCT(DATE(log_date)) AS log_date
             FROM logs
             WHERE user_id = ?1
             GROUP BY DATE(log_date)
             ORDER BY log_date DESC",
        )
        .bind(user_id)
        .map(|row: SqliteRow| row.get::<String, _>("log_date"))
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Summed points for a user in a `YYYY-MM` month.
    pub async fn points_for_month(&self, user_id: i64, month: &str) -> Result<f64> {
        let total: Option<f64> = sqlx::query(
            "SELECT SUM(points_received) AS total_points
             FROM logs
             WHERE user_id = ?1 AND strftime('%Y-%m', log_date) = ?2",
        )
        .bind(user_id)
        .bind(month)
        .map(|row: SqliteRow| row.get("total_points"))
        .fetch_one(self.pool())
        .await?;
        Ok((total.unwrap_or(0.0) * 100.0).round() / 100.0)
    }

    /// Summed points for a user within an achievement group, all time.
    pub async fn points_for_achievement_group(&self, user_id: i64, group: &str) -> Result<f64> {
        let total: Option<f64> = sqlx::query(
            "SELECT SUM(points_received) AS total_points
             FROM logs
             WHERE user_id = ?1 AND achievement_group = ?2",
        )
        .bind(user_id)
        .bind(group)
        .map(|row: SqliteRow| row.get("total_points"))
        .fetch_one(self.pool())
        .await?;
        Ok(total.unwrap_or(0.0))
    }

    /// Full log rows for export, newest first.
    pub async fn export_logs(&self, user_id: i64) -> Result<Vec<ExportEntry>> {
        let rows = sqlx::query(
            "SELECT log_id, media_type, media_name, comment, amount_logged,
                    points_received, log_date
             FROM logs
             WHERE user_id = ?1
             ORDER BY log_date DESC",
        )
        .bind(user_id)
        .map(|row: SqliteRow| ExportEntry {
            log_id: row.get("log_id"),
            media_type: row.get("media_type"),
            media_name: row.get("media_name"),
            comment: row.get("comment"),
            amount_logged: row.get("amount_logged"),
            points_received: row.get("points_received"),
            log_date: row.get("log_date"),
        })
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Top 20 users by points for a month (`ALL` = all time), optionally
    /// filtered to one media type.
    pub async fn monthly_leaderboard(
        &self,
        month: &str,
        media_type: Option<&str>,
    ) -> Result<Vec<LeaderboardEntry>> {
        let rows = sqlx::query(
            "SELECT user_id, SUM(points_received) AS total_points,
                    SUM(amount_logged) AS total_amount
             FROM logs
             WHERE (?1 = 'ALL' OR strftime('%Y-%m', log_date) = ?1)
               AND (?2 IS NULL OR media_type = ?2)
             GROUP BY user_id
             ORDER BY total_points DESC
             LIMIT 20",
        )
        .bind(month)
        .bind(media_type)
        .map(|row: SqliteRow| LeaderboardEntry {
            user_id: row.get("user_id"),
            total_points: row.get::<Option<f64>, _>("total_points").unwrap_or(0.0),
            total_amount: row.get::<Option<i64>, _>("total_amount").unwrap_or(0),
        })
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// One user's summed points and amount for a month (`ALL` = all time),
    /// optionally filtered to one media type.
    pub async fn user_month_totals(
        &self,
        user_id: i64,
        month: &str,
        media_type: Option<&str>,
    ) -> Result<(f64, i64)> {
        let row = sqlx::query(
            "SELECT SUM(points_received) AS total_points,
                    SUM(amount_logged) AS total_amount
             FROM logs
             WHERE user_id = ?1
               AND (?2 = 'ALL' OR strftime('%Y-%m', log_date) = ?2)
               AND (?3 IS NULL OR media_type = ?3)",
        )
        .bind(user_id)
        .bind(month)
        .bind(media_type)
        .map(|row: SqliteRow| {
            (
                row.get::<Option<f64>, _>("total_points").unwrap_or(0.0),
                row.get::<Option<i64>, _>("total_amount").unwrap_or(0),
            )
        })
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    /// A user's logs between two timestamps, oldest first.
    pub async fn logs_for_period(
        &self,
        user_id: i64,
        from: &str,
        to: &str,
    ) -> Result<Vec<PeriodEntry>> {
        let rows = sqlx::query(
            "SELECT user_id, media_type, amount_logged, points_received, log_date
             FROM logs
             WHERE user_id = ?1 AND log_date BETWEEN ?2 AND ?3
             ORDER BY log_date",
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .map(map_period_entry)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Every user's logs between two timestamps, oldest first, optionally
    /// filtered to one media type.
    pub async fn logs_for_race(
        &self,
        from: &str,
        to: &str,
        media_type: Option<&str>,
    ) -> Result<Vec<PeriodEntry>> {
        let rows = sqlx::query(
            "SELECT user_id, media_type, amount_logged, points_received, log_date
             FROM logs
             WHERE log_date BETWEEN ?1 AND ?2
               AND (?3 IS NULL OR media_type = ?3)
             ORDER BY log_date",
        )
        .bind(from)
        .bind(to)
        .bind(media_type)
        .map(map_period_entry)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}

fn map_period_entry(row: SqliteRow) -> PeriodEntry {
    PeriodEntry {
        user_id: row.get("user_id"),
        media_type: row.get("media_type"),
        amount_logged: row.get("amount_logged"),
        points_received: row.get("points_received"),
        log_date: row.get("log_date"),
    }
}

#[cfg(test)]
mod tests {
    use crate::Db;

    async fn seed(db: &Db) {
        db.insert_log(1, "Manga", Some("Yotsuba"), None, 50, 10.0, "2024-03-01 10:00:00", "Manga")
            .await
            .unwrap();
        db.insert_log(1, "Anime", None, None, 2, 26.0, "2024-03-02 10:00:00", "Anime")
            .await
            .unwrap();
        db.insert_log(2, "Manga", None, None, 10, 2.0, "2024-03-02 11:00:00", "Manga")
            .await
            .unwrap();
        db.insert_log(1, "Manga", None, None, 5, 1.0, "2024-02-28 10:00:00", "Manga")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_delete_scoped_to_owner() {
        let db = Db::in_memory().await.unwrap();
        let id = db
            .insert_log(1, "Manga", None, None, 5, 1.0, "2024-03-01 00:00:00", "Manga")
            .await
            .unwrap();

        // wrong owner
        assert!(!db.delete_log(id, 2).await.unwrap());
        assert!(db.delete_log(id, 1).await.unwrap());
        assert!(db.user_logs(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_points_for_month() {
        let db = Db::in_memory().await.unwrap();
        seed(&db).await;
        assert_eq!(db.points_for_month(1, "2024-03").await.unwrap(), 36.0);
        assert_eq!(db.points_for_month(1, "2024-02").await.unwrap(), 1.0);
        assert_eq!(db.points_for_month(99, "2024-03").await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_leaderboard_ordering_and_filter() {
        let db = Db::in_memory().await.unwrap();
        seed(&db).await;

        let board = db.monthly_leaderboard("2024-03", None).await.unwrap();
        assert_eq!(board[0].user_id, 1);
        assert_eq!(board[0].total_points, 36.0);
        assert_eq!(board[1].user_id, 2);

        let manga_only = db
            .monthly_leaderboard("2024-03", Some("Manga"))
            .await
            .unwrap();
        assert_eq!(manga_only[0].total_points, 10.0);

        let all_time = db.monthly_leaderboard("ALL", None).await.unwrap();
        assert_eq!(all_time[0].total_points, 37.0);
    }

    #[tokio::test]
    async fn test_distinct_dates_newest_first() {
        let db = Db::in_memory().await.unwrap();
        seed(&db).await;
        let dates = db.distinct_log_dates(1).await.unwrap();
        assert_eq!(dates, vec!["2024-03-02", "2024-03-01", "2024-02-28"]);
    }

    #[tokio::test]
    async fn test_period_queries() {
        let db = Db::in_memory().await.unwrap();
        seed(&db).await;
        let period = db
            .logs_for_period(1, "2024-03-01 00:00:00", "2024-03-31 23:59:59")
            .await
            .unwrap();
        assert_eq!(period.len(), 2);
        assert_eq!(period[0].media_type, "Manga");

        let race = db
            .logs_for_race("2024-03-01 00:00:00", "2024-03-31 23:59:59", Some("Manga"))
            .await
            .unwrap();
        assert_eq!(race.len(), 2);
        assert!(race.iter().all(|l| l.media_type == "Manga"));
    }
}
