//! Idempotent schema bootstrap.

use crate::Db;
use kotori_common::Result;
use tracing::debug;

/// Every table and index, created on startup. All statements are
/// `IF NOT EXISTS` so the bootstrap can run on every launch.
const SCHEMA: &[&str] = &[
    // Immersion logs
    "CREATE TABLE IF NOT EXISTS logs (
        log_id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        media_type TEXT NOT NULL,
        media_name TEXT,
        comment TEXT,
        amount_logged INTEGER NOT NULL,
        points_received REAL NOT NULL,
        log_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        achievement_group TEXT)",
    "CREATE INDEX IF NOT EXISTS idx_logs_user_date ON logs (user_id, log_date)",
    // Immersion goals
    "CREATE TABLE IF NOT EXISTS user_goals (
        goal_id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        media_type TEXT NOT NULL,
        goal_type TEXT NOT NULL CHECK(goal_type IN ('points', 'amount')),
        goal_value INTEGER NOT NULL,
        end_date TIMESTAMP NOT NULL,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP)",
    // Media catalog caches
    "CREATE TABLE IF NOT EXISTS cached_anilist_results (
        primary_key INTEGER PRIMARY KEY AUTOINCREMENT,
        anilist_id INTEGER UNIQUE,
        title_english TEXT,
        title_native TEXT,
        cover_image_url TEXT,
        media_type TEXT NOT NULL,
        timestamp DATETIME DEFAULT CURRENT_TIMESTAMP)",
    "CREATE INDEX IF NOT EXISTS idx_anilist_title_english
        ON cached_anilist_results (title_english)",
    "CREATE INDEX IF NOT EXISTS idx_anilist_title_native
        ON cached_anilist_results (title_native)",
    "CREATE TABLE IF NOT EXISTS cached_vndb_results (
        primary_key INTEGER PRIMARY KEY AUTOINCREMENT,
        vndb_id TEXT UNIQUE,
        title TEXT,
        cover_image_url TEXT,
        cover_image_nsfw INTEGER DEFAULT 0,
        timestamp DATETIME DEFAULT CURRENT_TIMESTAMP)",
    "CREATE INDEX IF NOT EXISTS idx_vndb_title ON cached_vndb_results (title)",
    "CREATE TABLE IF NOT EXISTS cached_tmdb_results (
        primary_key INTEGER PRIMARY KEY AUTOINCREMENT,
        tmdb_id INTEGER UNIQUE,
        title TEXT,
        original_title TEXT,
        media_type TEXT NOT NULL,
        poster_path TEXT,
        timestamp DATETIME DEFAULT CURRENT_TIMESTAMP)",
    "CREATE INDEX IF NOT EXISTS idx_tmdb_title ON cached_tmdb_results (title)",
    // Quiz gating
    "CREATE TABLE IF NOT EXISTS quiz_attempts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        guild_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        quiz_name TEXT NOT NULL,
        created_at TIMESTAMP,
        result INTEGER)",
    "CREATE TABLE IF NOT EXISTS passed_quizzes (
        guild_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        quiz_name TEXT NOT NULL,
        PRIMARY KEY (guild_id, user_id, quiz_name))",
    // Bookmarks
    "CREATE TABLE IF NOT EXISTS user_bookmarks (
        guild_id INTEGER NOT NULL,
        channel_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        message_id INTEGER NOT NULL,
        message_link TEXT NOT NULL,
        dm_message_id INTEGER NOT NULL,
        PRIMARY KEY (user_id, message_id))",
    "CREATE TABLE IF NOT EXISTS bookmarked_messages (
        guild_id INTEGER NOT NULL,
        channel_id INTEGER NOT NULL,
        message_id INTEGER NOT NULL,
        message_author_id INTEGER NOT NULL,
        message_link TEXT NOT NULL,
        bookmark_count INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (guild_id, message_id))",
    // Kneel leaderboard
    "CREATE TABLE IF NOT EXISTS kneels (
        guild_id INTEGER NOT NULL,
        message_id INTEGER NOT NULL,
        discord_user_id INTEGER NOT NULL,
        kneel_score INTEGER NOT NULL,
        user_name TEXT,
        PRIMARY KEY (guild_id, message_id))",
    // Selfmutes
    "CREATE TABLE IF NOT EXISTS active_mutes (
        guild_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        mute_role_id INTEGER NOT NULL,
        roles_to_restore TEXT NOT NULL,
        end_time TIMESTAMP NOT NULL,
        PRIMARY KEY (guild_id, user_id))",
    // Scheduled event roles
    "CREATE TABLE IF NOT EXISTS event_roles (
        guild_id INTEGER NOT NULL,
        event_id INTEGER NOT NULL,
        role_id INTEGER NOT NULL,
        PRIMARY KEY (guild_id, event_id))",
    // Custom roles
    "CREATE TABLE IF NOT EXISTS custom_roles (
        guild_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        role_id INTEGER NOT NULL,
        role_name TEXT,
        PRIMARY KEY (guild_id, user_id))",
    "CREATE TABLE IF NOT EXISTS custom_role_settings (
        guild_id INTEGER NOT NULL,
        allowed_roles TEXT,
        reference_role_id INTEGER,
        reference_role_name TEXT,
        PRIMARY KEY (guild_id))",
    // Auto-receive roles
    "CREATE TABLE IF NOT EXISTS auto_receive_roles (
        guild_id INTEGER NOT NULL,
        role_id_to_have INTEGER NOT NULL,
        role_name_to_have TEXT,
        role_id_to_get INTEGER NOT NULL,
        role_name_to_get TEXT,
        PRIMARY KEY (guild_id, role_id_to_have, role_id_to_get))",
    "CREATE TABLE IF NOT EXISTS auto_receive_roles_banned (
        guild_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        user_name TEXT,
        role_id INTEGER NOT NULL,
        role_name TEXT,
        PRIMARY KEY (guild_id, user_id, role_id))",
    // Saved ranks
    "CREATE TABLE IF NOT EXISTS user_ranks (
        guild_id INTEGER NOT NULL,
        discord_user_id INTEGER NOT NULL,
        role_ids TEXT NOT NULL,
        PRIMARY KEY (guild_id, discord_user_id))",
    // Username cache
    "CREATE TABLE IF NOT EXISTS users (
        discord_user_id INTEGER PRIMARY KEY,
        user_name TEXT)",
    // Sticky messages
    "CREATE TABLE IF NOT EXISTS sticky_messages (
        guild_id INTEGER NOT NULL,
        channel_id INTEGER NOT NULL,
        original_message_id INTEGER NOT NULL,
        stickied_message_id INTEGER,
        PRIMARY KEY (guild_id, channel_id))",
    // Daily questions
    "CREATE TABLE IF NOT EXISTS daily_questions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        guild_id INTEGER NOT NULL,
        channel_id INTEGER NOT NULL,
        question TEXT NOT NULL,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP)",
];

impl Db {
    /// Create every table and index the bot uses.
    pub async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(self.pool()).await?;
        }
        debug!("Schema bootstrap complete ({} statements)", SCHEMA.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::Db;

    #[tokio::test]
    async fn test_schema_bootstrap_is_idempotent() {
        let db = Db::in_memory().await.unwrap();
        // Second run must not fail.
        db.init_schema().await.unwrap();
    }
}
