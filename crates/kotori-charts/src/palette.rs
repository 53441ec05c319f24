//! Fixed colors for media kinds and race participants.

use plotters::style::RGBColor;

/// Color used for a media kind in stacked charts.
pub fn media_color(media_type: &str) -> RGBColor {
    match media_type {
        "Book" => RGBColor(255, 127, 14),           // orange
        "Manga" => RGBColor(214, 39, 40),           // red
        "Reading" => RGBColor(227, 119, 194),       // pink
        "Reading Time" => RGBColor(44, 160, 44),    // green
        "Visual Novel" => RGBColor(23, 190, 207),   // cyan
        "Anime" => RGBColor(148, 103, 189),         // purple
        "Listening Time" => RGBColor(31, 119, 180), // blue
        _ => RGBColor(127, 127, 127),
    }
}

/// Categorical color for the n-th race participant.
pub fn participant_color(index: usize) -> RGBColor {
    const COLORS: [RGBColor; 10] = [
        RGBColor(31, 119, 180),
        RGBColor(255, 127, 14),
        RGBColor(44, 160, 44),
        RGBColor(214, 39, 40),
        RGBColor(148, 103, 189),
        RGBColor(140, 86, 75),
        RGBColor(227, 119, 194),
        RGBColor(127, 127, 127),
        RGBColor(188, 189, 34),
        RGBColor(23, 190, 207),
    ];
    COLORS[index % COLORS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_kinds_have_distinct_colors() {
        let kinds = [
            "Book",
            "Manga",
            "Reading",
            "Reading Time",
            "Visual Novel",
            "Anime",
            "Listening Time",
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(media_color(a), media_color(b));
            }
        }
    }

    #[test]
    fn test_participant_colors_cycle() {
        assert_eq!(participant_color(0), participant_color(10));
    }
}
