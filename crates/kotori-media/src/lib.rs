//! Media kind registry and external API clients.
//!
//! Each client owns a pooled HTTP client, a per-second rate limiter and an
//! exponential backoff retry policy. Server errors and timeouts retry;
//! client errors never do; rate-limit responses log and yield no results.

pub mod anilist;
pub mod completion;
pub mod kinds;
pub mod quiz_report;
pub mod tmdb;
pub mod vndb;

pub use anilist::AnilistClient;
pub use completion::CompletionClient;
pub use kinds::{AchievementGroup, Catalog, MediaKind};
pub use quiz_report::QuizReportClient;
pub use tmdb::TmdbClient;
pub use vndb::VndbClient;

/// Round to two decimal places, the precision points are stored with.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::round2;

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.0 / 3.0), 0.33);
        assert_eq!(round2(0.1 + 0.2), 0.3);
        assert_eq!(round2(13.0), 13.0);
    }
}
