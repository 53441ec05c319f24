//! Insert-or-update caches for the media catalog APIs.
//!
//! Every catalog lookup lands here keyed on the catalog's own id, so
//! autocomplete can answer from the cache first and only top up from the
//! network when the cache comes up short.

use crate::Db;
use kotori_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// A cached AniList entry.
#[derive(Debug, Clone)]
pub struct AnilistEntry {
    pub anilist_id: i64,
    pub title_english: Option<String>,
    pub title_native: Option<String>,
    pub cover_image_url: Option<String>,
}

/// A cached VNDB entry.
#[derive(Debug, Clone)]
pub struct VndbEntry {
    pub vndb_id: String,
    pub title: String,
    pub cover_image_url: Option<String>,
}

/// A cached TMDB entry.
#[derive(Debug, Clone)]
pub struct TmdbEntry {
    pub tmdb_id: i64,
    pub title: String,
    pub original_title: Option<String>,
    pub media_type: String,
}

impl Db {
    // ------------------------------------------------------------------
    // AniList
    // ------------------------------------------------------------------

    pub async fn upsert_anilist(
        &self,
        anilist_id: i64,
        title_english: Option<&str>,
        title_native: Option<&str>,
        cover_image_url: Option<&str>,
        media_type: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO cached_anilist_results
                 (anilist_id, title_english, title_native, cover_image_url, media_type)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(anilist_id) DO UPDATE SET
                 title_english = excluded.title_english,
                 title_native = excluded.title_native,
                 cover_image_url = excluded.cover_image_url,
                 media_type = excluded.media_type,
                 timestamp = CURRENT_TIMESTAMP",
        )
        .bind(anilist_id)
        .bind(title_english)
        .bind(title_native)
        .bind(cover_image_url)
        .bind(media_type)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Case- and whitespace-insensitive title search within one media type.
    pub async fn search_anilist(&self, input: &str, media_type: &str) -> Result<Vec<AnilistEntry>> {
        let rows = sqlx::query(
            "SELECT anilist_id, title_english, title_native, cover_image_url
             FROM cached_anilist_results
             WHERE (LOWER(REPLACE(title_english, ' ', '')) LIKE '%' || LOWER(REPLACE(?1, ' ', '')) || '%'
                 OR LOWER(REPLACE(title_native, ' ', '')) LIKE '%' || LOWER(REPLACE(?1, ' ', '')) || '%')
               AND media_type = ?2
             LIMIT 10",
        )
        .bind(input)
        .bind(media_type)
        .map(map_anilist)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn anilist_by_id(
        &self,
        anilist_id: i64,
        media_type: &str,
    ) -> Result<Option<AnilistEntry>> {
        let row = sqlx::query(
            "SELECT anilist_id, title_english, title_native, cover_image_url
             FROM cached_anilist_results
             WHERE anilist_id = ?1 AND media_type = ?2",
        )
        .bind(anilist_id)
        .bind(media_type)
        .map(map_anilist)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn anilist_thumbnail(&self, anilist_id: i64) -> Result<Option<String>> {
        let row: Option<Option<String>> = sqlx::query(
            "SELECT cover_image_url FROM cached_anilist_results WHERE anilist_id = ?1",
        )
        .bind(anilist_id)
        .map(|row: SqliteRow| row.get("cover_image_url"))
        .fetch_optional(self.pool())
        .await?;
        Ok(row.flatten())
    }

    pub async fn anilist_title(&self, anilist_id: i64) -> Result<Option<String>> {
        let row = sqlx::query(
            "SELECT title_english, title_native FROM cached_anilist_results WHERE anilist_id = ?1",
        )
        .bind(anilist_id)
        .map(|row: SqliteRow| {
            row.get::<Option<String>, _>("title_english")
                .or_else(|| row.get::<Option<String>, _>("title_native"))
        })
        .fetch_optional(self.pool())
        .await?;
        Ok(row.flatten())
    }

    // ------------------------------------------------------------------
    // VNDB
    // ------------------------------------------------------------------

    pub async fn upsert_vndb(
        &self,
        vndb_id: &str,
        title: &str,
        cover_image_url: Option<&str>,
        cover_image_nsfw: bool,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO cached_vndb_results (vndb_id, title, cover_image_url, cover_image_nsfw)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(vndb_id) DO UPDATE SET
                 title = excluded.title,
                 cover_image_url = excluded.cover_image_url,
                 timestamp = CURRENT_TIMESTAMP",
        )
        .bind(vndb_id)
        .bind(title)
        .bind(cover_image_url)
        .bind(cover_image_nsfw as i64)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn search_vndb(&self, input: &str) -> Result<Vec<VndbEntry>> {
        let rows = sqlx::query(
            "SELECT vndb_id, title, cover_image_url
             FROM cached_vndb_results
             WHERE LOWER(title) LIKE '%' || LOWER(?1) || '%'
             LIMIT 10",
        )
        .bind(input)
        .map(map_vndb)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn vndb_by_id(&self, vndb_id: &str) -> Result<Option<VndbEntry>> {
        let row = sqlx::query(
            "SELECT vndb_id, title, cover_image_url FROM cached_vndb_results WHERE vndb_id = ?1",
        )
        .bind(vndb_id)
        .map(map_vndb)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    /// Cover image, withheld for NSFW covers.
    pub async fn vndb_thumbnail(&self, vndb_id: &str) -> Result<Option<String>> {
        let row: Option<Option<String>> = sqlx::query(
            "SELECT cover_image_url FROM cached_vndb_results
             WHERE vndb_id = ?1 AND cover_image_nsfw = 0",
        )
        .bind(vndb_id)
        .map(|row: SqliteRow| row.get("cover_image_url"))
        .fetch_optional(self.pool())
        .await?;
        Ok(row.flatten())
    }

    pub async fn vndb_title(&self, vndb_id: &str) -> Result<Option<String>> {
        let row: Option<String> =
            sqlx::query("SELECT title FROM cached_vndb_results WHERE vndb_id = ?1")
                .bind(vndb_id)
                .map(|row: SqliteRow| row.get("title"))
                .fetch_optional(self.pool())
                .await?;
        Ok(row)
    }

    // ------------------------------------------------------------------
    // TMDB
    // ------------------------------------------------------------------

    pub async fn upsert_tmdb(
        &self,
        tmdb_id: i64,
        title: &str,
        original_title: Option<&str>,
        media_type: &str,
        poster_path: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO cached_tmdb_results (tmdb_id, title, original_title, media_type, poster_path)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(tmdb_id) DO UPDATE SET
                 title = excluded.title,
                 original_title = excluded.original_title,
                 media_type = excluded.media_type,
                 poster_path = excluded.poster_path,
                 timestamp = CURRENT_TIMESTAMP",
        )
        .bind(tmdb_id)
        .bind(title)
        .bind(original_title)
        .bind(media_type)
        .bind(poster_path)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn search_tmdb(&self, input: &str) -> Result<Vec<TmdbEntry>> {
        let rows = sqlx::query(
            "SELECT tmdb_id, title, original_title, media_type
             FROM cached_tmdb_results
             WHERE (LOWER(REPLACE(title, ' ', '')) LIKE '%' || LOWER(REPLACE(?1, ' ', '')) || '%'
                 OR LOWER(REPLACE(original_title, ' ', '')) LIKE '%' || LOWER(REPLACE(?1, ' ', '')) || '%')
             LIMIT 10",
        )
        .bind(input)
        .map(map_tmdb)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn tmdb_thumbnail(&self, tmdb_id: i64) -> Result<Option<String>> {
        let row: Option<Option<String>> =
            sqlx::query("SELECT poster_path FROM cached_tmdb_results WHERE tmdb_id = ?1")
                .bind(tmdb_id)
                .map(|row: SqliteRow| row.get("poster_path"))
                .fetch_optional(self.pool())
                .await?;
        Ok(row.flatten())
    }

    pub async fn tmdb_title(&self, tmdb_id: i64) -> Result<Option<String>> {
        let row: Option<String> =
            sqlx::query("SELECT title FROM cached_tmdb_results WHERE tmdb_id = ?1")
                .bind(tmdb_id)
                .map(|row: SqliteRow| row.get("title"))
                .fetch_optional(self.pool())
                .await?;
        Ok(row)
    }

    /// The TMDB media type (`movie`/`tv`), used to build source URLs.
    pub async fn tmdb_media_type(&self, tmdb_id: i64) -> Result<Option<String>> {
        let row: Option<String> =
            sqlx::query("SELECT media_type FROM cached_tmdb_results WHERE tmdb_id = ?1")
                .bind(tmdb_id)
                .map(|row: SqliteRow| row.get("media_type"))
                .fetch_optional(self.pool())
                .await?;
        Ok(row)
    }
}

fn map_anilist(row: SqliteRow) -> AnilistEntry {
    AnilistEntry {
        anilist_id: row.get("anilist_id"),
        title_english: row.get("title_english"),
        title_native: row.get("title_native"),
        cover_image_url: row.get("cover_image_url"),
    }
}

fn map_vndb(row: SqliteRow) -> VndbEntry {
    VndbEntry {
        vndb_id: row.get("vndb_id"),
        title: row.get("title"),
        cover_image_url: row.get("cover_image_url"),
    }
}

fn map_tmdb(row: SqliteRow) -> TmdbEntry {
    TmdbEntry {
        tmdb_id: row.get("tmdb_id"),
        title: row.get("title"),
        original_title: row.get("original_title"),
        media_type: row.get("media_type"),
    }
}

#[cfg(test)]
mod tests {
    use crate::Db;

    #[tokio::test]
    async fn test_anilist_upsert_and_search() {
        let db = Db::in_memory().await.unwrap();
        db.upsert_anilist(1, Some("Frieren"), Some("葬送のフリーレン"), Some("url1"), "ANIME")
            .await
            .unwrap();
        // Update replaces fields
        db.upsert_anilist(1, Some("Frieren"), Some("葬送のフリーレン"), Some("url2"), "ANIME")
            .await
            .unwrap();

        let found = db.search_anilist("fri eren", "ANIME").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].cover_image_url.as_deref(), Some("url2"));

        assert!(db.search_anilist("frieren", "MANGA").await.unwrap().is_empty());
        assert_eq!(db.anilist_thumbnail(1).await.unwrap().as_deref(), Some("url2"));
        assert_eq!(db.anilist_title(1).await.unwrap().as_deref(), Some("Frieren"));
    }

    #[tokio::test]
    async fn test_vndb_nsfw_thumbnail_withheld() {
        let db = Db::in_memory().await.unwrap();
        db.upsert_vndb("v17", "Ever17", Some("safe.jpg"), false)
            .await
            .unwrap();
        db.upsert_vndb("v99", "Something", Some("nsfw.jpg"), true)
            .await
            .unwrap();

        assert_eq!(db.vndb_thumbnail("v17").await.unwrap().as_deref(), Some("safe.jpg"));
        assert_eq!(db.vndb_thumbnail("v99").await.unwrap(), None);
        assert_eq!(db.vndb_title("v99").await.unwrap().as_deref(), Some("Something"));
    }

    #[tokio::test]
    async fn test_tmdb_media_type() {
        let db = Db::in_memory().await.unwrap();
        db.upsert_tmdb(42, "Shirokuma Cafe", Some("しろくまカフェ"), "tv", Some("/p.jpg"))
            .await
            .unwrap();

        assert_eq!(db.tmdb_media_type(42).await.unwrap().as_deref(), Some("tv"));
        let found = db.search_tmdb("shirokuma").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tmdb_id, 42);
    }
}
