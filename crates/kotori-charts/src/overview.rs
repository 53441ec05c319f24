//! Stacked daily points chart for the stats overview.

use crate::palette::media_color;
use chrono::NaiveDate;
use image::{DynamicImage, ImageOutputFormat, RgbImage};
use kotori_common::{KotoriError, Result};
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::io::Cursor;

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 800;

/// Per-day points, stacked by media type.
#[derive(Debug, Clone, Default)]
pub struct DailyStacks {
    /// Chart x axis, oldest first
    pub dates: Vec<NaiveDate>,
    /// One series per media type, aligned with `dates`
    pub series: Vec<(String, Vec<f64>)>,
}

impl DailyStacks {
    /// Shape `(media_type, date, points)` triples into aligned daily series.
    pub fn from_logs(logs: &[(String, NaiveDate, f64)]) -> Self {
        let mut dates: Vec<NaiveDate> = logs.iter().map(|(_, date, _)| *date).collect();
        dates.sort_unstable();
        dates.dedup();

        let mut per_type: BTreeMap<&str, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
        for (media_type, date, points) in logs {
            *per_type
                .entry(media_type.as_str())
                .or_default()
                .entry(*date)
                .or_default() += points;
        }

        let series = per_type
            .into_iter()
            .map(|(media_type, by_date)| {
                let values = dates
                    .iter()
                    .map(|date| by_date.get(date).copied().unwrap_or(0.0))
                    .collect();
                (media_type.to_string(), values)
            })
            .collect();

        Self { dates, series }
    }

    /// Tallest stacked column, for y axis scaling.
    fn max_stack(&self) -> f64 {
        (0..self.dates.len())
            .map(|i| self.series.iter().map(|(_, values)| values[i]).sum::<f64>())
            .fold(0.0, f64::max)
    }
}

/// Render the stacked daily points chart as PNG bytes.
pub fn render_overview_png(stacks: &DailyStacks, title: &str) -> Result<Vec<u8>> {
    if stacks.dates.is_empty() {
        return Err(KotoriError::chart("No data to render"));
    }

    let mut buffer = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE)
            .map_err(|e| KotoriError::chart(format!("Fill failed: {e}")))?;

        let n = stacks.dates.len();
        let max_y = (stacks.max_stack() * 1.1).max(1.0);

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 36))
            .margin(20)
            .x_label_area_size(70)
            .y_label_area_size(70)
            .build_cartesian_2d(-0.5f64..n as f64 - 0.5, 0f64..max_y)
            .map_err(|e| KotoriError::chart(format!("Chart setup failed: {e}")))?;

        let dates = stacks.dates.clone();
        chart
            .configure_mesh()
            .y_desc("Points")
            .x_desc("Date")
            .x_labels(n.min(12))
            .x_label_formatter(&|x| {
                let index = x.round() as usize;
                dates
                    .get(index)
                    .map(|d| d.format("%m-%d").to_string())
                    .unwrap_or_default()
            })
            .draw()
            .map_err(|e| KotoriError::chart(format!("Mesh draw failed: {e}")))?;

        let mut base = vec![0.0f64; n];
        for (media_type, values) in &stacks.series {
            let color = media_color(media_type);
            let segments: Vec<(f64, f64, f64)> = values
                .iter()
                .enumerate()
                .map(|(i, v)| (i as f64, base[i], base[i] + v))
                .collect();
            chart
                .draw_series(segments.iter().map(|(x, y0, y1)| {
                    Rectangle::new([(x - 0.4, *y0), (x + 0.4, *y1)], color.filled())
                }))
                .map_err(|e| KotoriError::chart(format!("Series draw failed: {e}")))?
                .label(media_type.clone())
                .legend(move |(x, y)| {
                    Rectangle::new([(x, y - 6), (x + 12, y + 6)], color.filled())
                });
            for (i, v) in values.iter().enumerate() {
                base[i] += v;
            }
        }

        chart
            .configure_series_labels()
            .border_style(BLACK)
            .background_style(WHITE.mix(0.8))
            .draw()
            .map_err(|e| KotoriError::chart(format!("Legend draw failed: {e}")))?;

        root.present()
            .map_err(|e| KotoriError::chart(format!("Present failed: {e}")))?;
    }

    let img = RgbImage::from_raw(WIDTH, HEIGHT, buffer)
        .ok_or_else(|| KotoriError::chart("Bitmap buffer size mismatch"))?;
    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut png, ImageOutputFormat::Png)
        .map_err(|e| KotoriError::chart(format!("PNG encoding failed: {e}")))?;
    Ok(png.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_from_logs_aligns_series() {
        let logs = vec![
            ("Manga".to_string(), date("2024-03-02"), 2.0),
            ("Manga".to_string(), date("2024-03-01"), 1.0),
            ("Anime".to_string(), date("2024-03-02"), 13.0),
            ("Manga".to_string(), date("2024-03-02"), 3.0),
        ];
        let stacks = DailyStacks::from_logs(&logs);

        assert_eq!(stacks.dates, vec![date("2024-03-01"), date("2024-03-02")]);
        assert_eq!(stacks.series.len(), 2);
        // BTreeMap ordering: Anime before Manga
        assert_eq!(stacks.series[0].0, "Anime");
        assert_eq!(stacks.series[0].1, vec![0.0, 13.0]);
        assert_eq!(stacks.series[1].1, vec![1.0, 5.0]);
        assert_eq!(stacks.max_stack(), 18.0);
    }

    #[test]
    #[ignore = "needs system fonts"]
    fn test_render_produces_png() {
        let logs = vec![
            ("Manga".to_string(), date("2024-03-01"), 4.0),
            ("Anime".to_string(), date("2024-03-02"), 13.0),
        ];
        let stacks = DailyStacks::from_logs(&logs);
        let png = render_overview_png(&stacks, "Points Over Time").unwrap();
        // PNG magic bytes
        assert_eq!(&png[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_render_rejects_empty() {
        assert!(render_overview_png(&DailyStacks::default(), "t").is_err());
    }
}
