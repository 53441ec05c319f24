//! Animated leaderboard race rendering.

use crate::palette::participant_color;
use chrono::NaiveDate;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};
use kotori_common::{KotoriError, Result};
use plotters::prelude::*;
use std::collections::HashMap;
use tracing::debug;

const WIDTH: u32 = 960;
const HEIGHT: u32 = 540;
const MAX_BARS: usize = 15;
const FRAME_DELAY_MS: u32 = 500;

/// One day of the race: cumulative standings, highest first.
#[derive(Debug, Clone)]
pub struct RaceFrame {
    pub date: NaiveDate,
    /// `(user name, cumulative value)`, highest first, capped at [`MAX_BARS`]
    pub standings: Vec<(String, f64)>,
}

/// Accumulate `(user, date, value)` triples into one frame per day.
///
/// Every user that ever scored appears from their first day on, so bars
/// never vanish mid-race.
pub fn cumulative_standings(
    logs: &[(String, NaiveDate, f64)],
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<RaceFrame> {
    let mut totals: HashMap<&str, f64> = HashMap::new();
    let mut frames = Vec::new();

    let mut day = from;
    while day <= to {
        for (user, date, value) in logs {
            if *date == day {
                *totals.entry(user.as_str()).or_default() += value;
            }
        }

        let mut standings: Vec<(String, f64)> = totals
            .iter()
            .map(|(user, total)| (user.to_string(), *total))
            .collect();
        standings.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        standings.truncate(MAX_BARS);

        frames.push(RaceFrame {
            date: day,
            standings,
        });
        day = day.succ_opt().expect("date overflow");
    }

    frames
}

/// Render the race frames as an animated GIF.
pub fn render_race_gif(frames: &[RaceFrame], title: &str) -> Result<Vec<u8>> {
    if frames.is_empty() {
        return Err(KotoriError::chart("No data to render"));
    }

    let max_value = frames
        .iter()
        .flat_map(|f| f.standings.iter().map(|(_, v)| *v))
        .fold(0.0f64, f64::max)
        .max(1.0);

    // Stable color per participant across frames
    let mut color_index: HashMap<&str, usize> = HashMap::new();
    for frame in frames {
        for (user, _) in &frame.standings {
            let next = color_index.len();
            color_index.entry(user.as_str()).or_insert(next);
        }
    }

    let mut gif = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut gif);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| KotoriError::chart(format!("GIF setup failed: {e}")))?;

        for frame in frames {
            let rgb = render_race_frame(frame, title, max_value, &color_index)?;
            let rgba = rgb_to_rgba(&rgb);
            let image = RgbaImage::from_raw(WIDTH, HEIGHT, rgba)
                .ok_or_else(|| KotoriError::chart("Bitmap buffer size mismatch"))?;
            encoder
                .encode_frame(Frame::from_parts(
                    image,
                    0,
                    0,
                    Delay::from_numer_denom_ms(FRAME_DELAY_MS, 1),
                ))
                .map_err(|e| KotoriError::chart(format!("GIF frame encoding failed: {e}")))?;
        }
    }

    debug!("Rendered race GIF: {} frames, {} bytes", frames.len(), gif.len());
    Ok(gif)
}

fn render_race_frame(
    frame: &RaceFrame,
    title: &str,
    max_value: f64,
    color_index: &HashMap<&str, usize>,
) -> Result<Vec<u8>> {
    let mut buffer = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE)
            .map_err(|e| KotoriError::chart(format!("Fill failed: {e}")))?;

        let caption = format!("{title} - {}", frame.date.format("%b %-d, %Y"));
        let mut chart = ChartBuilder::on(&root)
            .caption(caption, ("sans-serif", 28))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(10)
            .build_cartesian_2d(0f64..max_value * 1.05, 0f64..MAX_BARS as f64)
            .map_err(|e| KotoriError::chart(format!("Chart setup failed: {e}")))?;

        chart
            .configure_mesh()
            .disable_y_mesh()
            .disable_y_axis()
            .draw()
            .map_err(|e| KotoriError::chart(format!("Mesh draw failed: {e}")))?;

        // Highest bar on top
        for (rank, (user, value)) in frame.standings.iter().enumerate() {
            let y = (MAX_BARS - 1 - rank) as f64;
            let color = participant_color(color_index.get(user.as_str()).copied().unwrap_or(0));
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(0.0, y + 0.1), (*value, y + 0.9)],
                    color.filled(),
                )))
                .map_err(|e| KotoriError::chart(format!("Bar draw failed: {e}")))?;
            chart
                .draw_series(std::iter::once(Text::new(
                    format!("{user} ({value:.1})"),
                    (max_value * 0.01, y + 0.35),
                    ("sans-serif", 16),
                )))
                .map_err(|e| KotoriError::chart(format!("Label draw failed: {e}")))?;
        }

        root.present()
            .map_err(|e| KotoriError::chart(format!("Present failed: {e}")))?;
    }
    Ok(buffer)
}

fn rgb_to_rgba(rgb: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(rgb.len() / 3 * 4);
    for px in rgb.chunks_exact(3) {
        rgba.extend_from_slice(px);
        rgba.push(255);
    }
    rgba
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_cumulative_standings() {
        let logs = vec![
            ("alice".to_string(), date("2024-03-01"), 5.0),
            ("bob".to_string(), date("2024-03-01"), 3.0),
            ("bob".to_string(), date("2024-03-02"), 4.0),
        ];
        let frames = cumulative_standings(&logs, date("2024-03-01"), date("2024-03-03"));

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].standings[0], ("alice".to_string(), 5.0));
        // Day two: bob overtakes
        assert_eq!(frames[1].standings[0], ("bob".to_string(), 7.0));
        // Day three: nothing logged, standings carry over
        assert_eq!(frames[2].standings, frames[1].standings);
    }

    #[test]
    fn test_standings_tie_break_is_stable() {
        let logs = vec![
            ("zoe".to_string(), date("2024-03-01"), 2.0),
            ("amy".to_string(), date("2024-03-01"), 2.0),
        ];
        let frames = cumulative_standings(&logs, date("2024-03-01"), date("2024-03-01"));
        assert_eq!(frames[0].standings[0].0, "amy");
    }

    #[test]
    #[ignore = "needs system fonts"]
    fn test_render_produces_gif() {
        let logs = vec![
            ("alice".to_string(), date("2024-03-01"), 5.0),
            ("bob".to_string(), date("2024-03-02"), 8.0),
        ];
        let frames = cumulative_standings(&logs, date("2024-03-01"), date("2024-03-02"));
        let gif = render_race_gif(&frames, "Points").unwrap();
        assert_eq!(&gif[..3], b"GIF");
    }

    #[test]
    fn test_render_rejects_empty() {
        assert!(render_race_gif(&[], "t").is_err());
    }
}
