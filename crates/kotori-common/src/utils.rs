//! Shared time, text and formatting helpers

use chrono::{NaiveDate, NaiveDateTime, Timelike, Utc};

/// Storage format for timestamps in the database.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a timestamp the way it is stored in the database.
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp in database storage format.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).ok()
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Current UTC time, truncated to whole seconds.
pub fn utc_now() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Render a Discord relative timestamp (`<t:...:R>`) for a UTC time.
pub fn discord_relative(ts: NaiveDateTime) -> String {
    format!("<t:{}:R>", ts.and_utc().timestamp())
}

/// Render a Discord date timestamp (`<t:...:D>`) for a UTC time.
pub fn discord_date(ts: NaiveDateTime) -> String {
    format!("<t:{}:D>", ts.and_utc().timestamp())
}

/// Truncate a string to at most `max` characters, respecting char boundaries.
pub fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Append an `s` to `unit` when `amount` is greater than one.
pub fn pluralize(unit: &str, amount: i64) -> String {
    if amount > 1 {
        format!("{unit}s")
    } else {
        unit.to_string()
    }
}

/// Ten-segment emoji progress bar with a percentage suffix.
pub fn progress_bar(progress: f64, goal: f64) -> String {
    let percentage = if goal <= 0.0 {
        100
    } else {
        ((progress / goal) * 100.0) as i64
    };
    let percentage = percentage.clamp(0, 100);
    let filled = (percentage / 10) as usize;
    format!(
        "{}{} ({percentage}%)",
        "🟩".repeat(filled),
        "⬜".repeat(10 - filled)
    )
}

/// Escape a single CSV field (RFC 4180 quoting).
pub fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Join role ids into the comma-separated form stored in the database.
pub fn join_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse a comma-separated id list back into ids, skipping garbage entries.
pub fn split_ids(s: &str) -> Vec<u64> {
    s.split(',').filter_map(|part| part.parse().ok()).collect()
}

/// Parse a `#RGB` or `#RRGGBB` hex color into its numeric value.
pub fn parse_hex_color(code: &str) -> Option<u32> {
    let digits = code.strip_prefix('#')?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match digits.len() {
        6 => u32::from_str_radix(digits, 16).ok(),
        3 => {
            // #abc expands to #aabbcc
            let expanded: String = digits.chars().flat_map(|c| [c, c]).collect();
            u32::from_str_radix(&expanded, 16).ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_round_trip() {
        let ts = parse_timestamp("2024-03-01 12:30:00").unwrap();
        assert_eq!(format_timestamp(ts), "2024-03-01 12:30:00");
    }

    #[test]
    fn test_parse_date_rejects_invalid() {
        assert!(parse_date("2024-13-01").is_none());
        assert!(parse_date("yesterday").is_none());
        assert!(parse_date("2024-02-29").is_some());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("こんにちは", 3), "こんに");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("page", 1), "page");
        assert_eq!(pluralize("page", 2), "pages");
        assert_eq!(pluralize("episode", 0), "episode");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(5.0, 10.0), "🟩🟩🟩🟩🟩⬜⬜⬜⬜⬜ (50%)");
        assert_eq!(progress_bar(20.0, 10.0), "🟩🟩🟩🟩🟩🟩🟩🟩🟩🟩 (100%)");
        assert!(progress_bar(0.0, 10.0).contains("(0%)"));
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_id_round_trip() {
        let ids = vec![1_u64, 42, 9_007_199_254_740_993];
        assert_eq!(split_ids(&join_ids(&ids)), ids);
        assert!(split_ids("").is_empty());
        assert_eq!(split_ids("1,x,3"), vec![1, 3]);
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#A47267"), Some(0xA47267));
        assert_eq!(parse_hex_color("#abc"), Some(0xAABBCC));
        assert_eq!(parse_hex_color("A47267"), None);
        assert_eq!(parse_hex_color("#xyz"), None);
        assert_eq!(parse_hex_color("#12345"), None);
    }
}
