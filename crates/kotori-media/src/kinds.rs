//! The media kind registry: units, caps, achievement groups and catalogs.

use crate::round2;

/// Achievement groups pool points across related media kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AchievementGroup {
    VisualNovel,
    Manga,
    Anime,
    Reading,
    Listening,
}

impl AchievementGroup {
    pub const ALL: [AchievementGroup; 5] = [
        AchievementGroup::VisualNovel,
        AchievementGroup::Manga,
        AchievementGroup::Anime,
        AchievementGroup::Reading,
        AchievementGroup::Listening,
    ];

    /// Name stored in the `achievement_group` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementGroup::VisualNovel => "Visual Novel",
            AchievementGroup::Manga => "Manga",
            AchievementGroup::Anime => "Anime",
            AchievementGroup::Reading => "Reading",
            AchievementGroup::Listening => "Listening",
        }
    }
}

/// Which external catalog backs a media kind's autocomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Catalog {
    /// AniList, scoped to `ANIME` or `MANGA`
    Anilist,
    /// VNDB visual novel database
    Vndb,
    /// TMDB movie/series search
    Tmdb,
}

/// Everything a user can log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, poise::ChoiceParameter)]
pub enum MediaKind {
    #[name = "Visual Novel (in characters read)"]
    VisualNovel,
    #[name = "Manga (in pages read)"]
    Manga,
    #[name = "Anime (in episodes watched)"]
    Anime,
    #[name = "Book (in pages read)"]
    Book,
    #[name = "Reading Time (in minutes)"]
    ReadingTime,
    #[name = "Listening Time (in minutes)"]
    ListeningTime,
    #[name = "Reading (in characters read)"]
    Reading,
}

impl MediaKind {
    pub const ALL: [MediaKind; 7] = [
        MediaKind::VisualNovel,
        MediaKind::Manga,
        MediaKind::Anime,
        MediaKind::Book,
        MediaKind::ReadingTime,
        MediaKind::ListeningTime,
        MediaKind::Reading,
    ];

    /// Canonical name, as stored in the `media_type` column.
    pub fn db_name(&self) -> &'static str {
        match self {
            MediaKind::VisualNovel => "Visual Novel",
            MediaKind::Manga => "Manga",
            MediaKind::Anime => "Anime",
            MediaKind::Book => "Book",
            MediaKind::ReadingTime => "Reading Time",
            MediaKind::ListeningTime => "Listening Time",
            MediaKind::Reading => "Reading",
        }
    }

    /// Reverse of [`MediaKind::db_name`].
    pub fn from_db_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.db_name() == name)
    }

    /// Unit a single logged amount is measured in.
    pub fn unit_name(&self) -> &'static str {
        match self {
            MediaKind::VisualNovel | MediaKind::Reading => "character",
            MediaKind::Manga | MediaKind::Book => "page",
            MediaKind::Anime => "episode",
            MediaKind::ReadingTime | MediaKind::ListeningTime => "minute",
        }
    }

    /// Largest amount accepted in one log entry.
    pub fn max_logged(&self) -> i64 {
        match self {
            MediaKind::VisualNovel | MediaKind::Reading => 2_000_000,
            MediaKind::Manga => 1_000,
            MediaKind::Anime => 100,
            MediaKind::Book => 500,
            MediaKind::ReadingTime | MediaKind::ListeningTime => 1_440,
        }
    }

    /// Achievement group this kind feeds points into.
    pub fn achievement_group(&self) -> AchievementGroup {
        match self {
            MediaKind::VisualNovel => AchievementGroup::VisualNovel,
            MediaKind::Manga => AchievementGroup::Manga,
            MediaKind::Anime => AchievementGroup::Anime,
            MediaKind::Book | MediaKind::ReadingTime | MediaKind::Reading => {
                AchievementGroup::Reading
            }
            MediaKind::ListeningTime => AchievementGroup::Listening,
        }
    }

    /// External catalog backing this kind's name autocomplete, when any.
    pub fn catalog(&self) -> Option<Catalog> {
        match self {
            MediaKind::VisualNovel => Some(Catalog::Vndb),
            MediaKind::Manga | MediaKind::Anime => Some(Catalog::Anilist),
            MediaKind::ListeningTime => Some(Catalog::Tmdb),
            MediaKind::Book | MediaKind::ReadingTime | MediaKind::Reading => None,
        }
    }

    /// AniList media type string for this kind, when AniList-backed.
    pub fn anilist_type(&self) -> Option<&'static str> {
        match self {
            MediaKind::Anime => Some("ANIME"),
            MediaKind::Manga => Some("MANGA"),
            _ => None,
        }
    }

    /// Public page for a catalog entry of this kind.
    ///
    /// `tmdb_media_type` is only consulted for TMDB-backed kinds.
    pub fn source_url(&self, id: &str, tmdb_media_type: Option<&str>) -> Option<String> {
        match self {
            MediaKind::VisualNovel => Some(format!("https://vndb.org/{id}")),
            MediaKind::Manga => Some(format!("https://anilist.co/manga/{id}")),
            MediaKind::Anime => Some(format!("https://anilist.co/anime/{id}")),
            MediaKind::ListeningTime => {
                let media_type = tmdb_media_type?;
                Some(format!("https://www.themoviedb.org/{media_type}/{id}"))
            }
            _ => None,
        }
    }

    /// Points for a logged amount at the given per-unit multiplier.
    pub fn points_for(&self, amount: i64, multiplier: f64) -> f64 {
        round2(amount as f64 * multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_name_round_trip() {
        for kind in MediaKind::ALL {
            assert_eq!(MediaKind::from_db_name(kind.db_name()), Some(kind));
        }
        assert_eq!(MediaKind::from_db_name("Podcast"), None);
    }

    #[test]
    fn test_units_and_caps() {
        assert_eq!(MediaKind::Anime.unit_name(), "episode");
        assert_eq!(MediaKind::Anime.max_logged(), 100);
        assert_eq!(MediaKind::VisualNovel.max_logged(), 2_000_000);
        assert_eq!(MediaKind::ReadingTime.unit_name(), "minute");
    }

    #[test]
    fn test_achievement_groups_pool_reading() {
        assert_eq!(MediaKind::Book.achievement_group(), AchievementGroup::Reading);
        assert_eq!(MediaKind::ReadingTime.achievement_group(), AchievementGroup::Reading);
        assert_eq!(MediaKind::Reading.achievement_group(), AchievementGroup::Reading);
        assert_eq!(MediaKind::Manga.achievement_group(), AchievementGroup::Manga);
    }

    #[test]
    fn test_source_urls() {
        assert_eq!(
            MediaKind::Anime.source_url("123", None).as_deref(),
            Some("https://anilist.co/anime/123")
        );
        assert_eq!(
            MediaKind::VisualNovel.source_url("v17", None).as_deref(),
            Some("https://vndb.org/v17")
        );
        assert_eq!(
            MediaKind::ListeningTime.source_url("42", Some("tv")).as_deref(),
            Some("https://www.themoviedb.org/tv/42")
        );
        // TMDB kind without a cached media type has no link
        assert_eq!(MediaKind::ListeningTime.source_url("42", None), None);
        assert_eq!(MediaKind::Book.source_url("42", None), None);
    }

    #[test]
    fn test_points_rounding() {
        assert_eq!(MediaKind::Manga.points_for(25, 0.2), 5.0);
        assert_eq!(MediaKind::VisualNovel.points_for(1000, 1.0 / 350.0), 2.86);
    }
}
