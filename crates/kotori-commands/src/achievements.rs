//! Achievement thresholds and progress lines.

use kotori_media::round2;

pub const THRESHOLDS: [i64; 8] = [1, 100, 300, 1_000, 2_000, 10_000, 25_000, 100_000];

pub const TITLES: [&str; 8] = [
    "Beginner 🌱",
    "Initiate ⚡️",
    "Apprentice 🎓",
    "Hobbyist 🥇",
    "Enthusiast 🔥",
    "Aficionado 🌟",
    "Sage 🤖",
    "Master 🏆",
];

/// Achievement state after a log added `delta` points to a group total.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AchievementProgress {
    /// Title just crossed by this log, when any
    pub reached: Option<String>,
    /// Next title line, with the threshold and the current total
    pub next: Option<String>,
}

/// Compute which achievement a log just crossed, and what comes next.
pub fn progress_after_log(group: &str, total: f64, delta: f64) -> AchievementProgress {
    let mut progress = AchievementProgress::default();
    for (threshold, title) in THRESHOLDS.iter().zip(TITLES.iter()) {
        let threshold_f = *threshold as f64;
        if total - delta < threshold_f && threshold_f <= total {
            progress.reached = Some(format!("{group} {title}"));
        } else if total < threshold_f {
            progress.next = Some(format!(
                "{group} {title} at `{threshold}` {group} points (Current: `{}`)",
                round2(total)
            ));
            break;
        }
    }
    progress
}

/// Reached/next summary lines for the achievements overview.
pub fn summary_lines(group: &str, total: f64) -> (Option<String>, Option<String>) {
    let mut reached = None;
    let mut next = None;
    for (threshold, title) in THRESHOLDS.iter().zip(TITLES.iter()) {
        if total >= *threshold as f64 {
            reached = Some(format!(
                "- 🎉 **Reached {group} {title} (`{threshold}` points)**"
            ));
        } else {
            next = Some(format!(
                "- Next: {group} {title} (`{}/{threshold}` points)",
                round2(total)
            ));
            break;
        }
    }
    (reached, next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_log_reaches_beginner() {
        let progress = progress_after_log("Manga", 5.0, 5.0);
        assert_eq!(progress.reached.as_deref(), Some("Manga Beginner 🌱"));
        assert!(progress.next.unwrap().contains("Initiate"));
    }

    #[test]
    fn test_no_crossing() {
        let progress = progress_after_log("Manga", 50.0, 5.0);
        assert!(progress.reached.is_none());
        assert!(progress.next.unwrap().contains("`100`"));
    }

    #[test]
    fn test_crossing_mid_ladder() {
        let progress = progress_after_log("Anime", 305.0, 10.0);
        assert_eq!(progress.reached.as_deref(), Some("Anime Apprentice 🎓"));
        assert!(progress.next.unwrap().contains("Hobbyist"));
    }

    #[test]
    fn test_top_of_ladder_has_no_next() {
        let progress = progress_after_log("Anime", 100_500.0, 10.0);
        assert!(progress.next.is_none());
    }

    #[test]
    fn test_summary_lines() {
        let (reached, next) = summary_lines("Reading", 150.0);
        assert!(reached.unwrap().contains("Initiate"));
        assert!(next.unwrap().contains("150/300"));

        let (reached, next) = summary_lines("Reading", 0.0);
        assert!(reached.is_none());
        assert!(next.unwrap().contains("Beginner"));
    }
}
