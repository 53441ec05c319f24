//! Immersion overview: per-media breakdown and a stacked daily chart.

use crate::framework::{Context, Error};
use crate::usernames::get_username;
use chrono::{Datelike, NaiveDate};
use kotori_charts::{render_overview_png, DailyStacks};
use kotori_common::utils::{format_timestamp, parse_date, parse_timestamp, pluralize, utc_now};
use kotori_db::logs::PeriodEntry;
use kotori_media::{round2, MediaKind};
use poise::serenity_prelude as serenity;
use serenity::{CreateAttachment, CreateEmbed};
use std::collections::BTreeMap;

/// Per-media totals line block for the overview embed.
pub fn breakdown_lines(entries: &[PeriodEntry]) -> String {
    let mut totals: BTreeMap<&str, (i64, f64)> = BTreeMap::new();
    for entry in entries {
        let slot = totals.entry(entry.media_type.as_str()).or_default();
        slot.0 += entry.amount_logged;
        slot.1 += entry.points_received;
    }
    totals
        .into_iter()
        .map(|(media_type, (amount, points))| {
            let unit = MediaKind::from_db_name(media_type)
                .map(|kind| pluralize(kind.unit_name(), amount))
                .unwrap_or_else(|| "units".to_string());
            format!("{media_type}: {amount} {unit} → {} pts", round2(points))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn chart_input(entries: &[PeriodEntry]) -> Vec<(String, NaiveDate, f64)> {
    entries
        .iter()
        .filter_map(|entry| {
            let date = parse_timestamp(&entry.log_date)?.date();
            Some((entry.media_type.clone(), date, entry.points_received))
        })
        .collect()
}

/// Display an immersion overview for a specified period.
#[poise::command(slash_command)]
pub async fn log_stats(
    ctx: Context<'_>,
    #[description = "Optional user to display the immersion overview for."]
    user: Option<serenity::User>,
    #[description = "Optional start date (YYYY-MM-DD)."] from_date: Option<String>,
    #[description = "Optional end date (YYYY-MM-DD)."] to_date: Option<String>,
) -> Result<(), Error> {
    ctx.defer().await?;

    let now = utc_now();
    let from = match &from_date {
        Some(input) => match parse_date(input) {
            Some(date) => date.and_time(chrono::NaiveTime::MIN),
            None => {
                ctx.say("Invalid from_date format. Please use YYYY-MM-DD.").await?;
                return Ok(());
            }
        },
        None => now
            .date()
            .with_day(1)
            .unwrap_or(now.date())
            .and_time(chrono::NaiveTime::MIN),
    };
    let to = match &to_date {
        Some(input) => match parse_date(input) {
            Some(date) => date.and_hms_opt(23, 59, 59).unwrap_or(now),
            None => {
                ctx.say("Invalid to_date format. Please use YYYY-MM-DD.").await?;
                return Ok(());
            }
        },
        None => now,
    };

    let target_id = user.as_ref().map(|u| u.id).unwrap_or(ctx.author().id);
    let data = ctx.data();
    let user_name = get_username(ctx.serenity_context(), data, target_id).await;

    let entries = data
        .db
        .logs_for_period(
            target_id.get() as i64,
            &format_timestamp(from),
            &format_timestamp(to),
        )
        .await?;
    if entries.is_empty() {
        ctx.say("No logs available for the specified period.").await?;
        return Ok(());
    }

    let total_points = round2(entries.iter().map(|e| e.points_received).sum());
    let breakdown = breakdown_lines(&entries);
    let stacks = DailyStacks::from_logs(&chart_input(&entries));
    let png =
        tokio::task::spawn_blocking(move || render_overview_png(&stacks, "Points Over Time"))
            .await
            .map_err(|e| kotori_common::KotoriError::new(format!("Chart task failed: {e}")))??;

    let timeframe = format!("{} to {}", from.date(), to.date());
    let embed = CreateEmbed::new()
        .title("Immersion Overview")
        .colour(serenity::Colour::BLURPLE)
        .field("User", user_name, true)
        .field("Timeframe", timeframe, true)
        .field("Total Points", total_points.to_string(), true)
        .field("Breakdown", breakdown, false)
        .attachment("stats.png");

    ctx.send(
        poise::CreateReply::default()
            .embed(embed)
            .attachment(CreateAttachment::bytes(png, "stats.png")),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(media: &str, amount: i64, points: f64) -> PeriodEntry {
        PeriodEntry {
            user_id: 1,
            media_type: media.to_string(),
            amount_logged: amount,
            points_received: points,
            log_date: "2024-03-01 10:00:00".to_string(),
        }
    }

    #[test]
    fn test_breakdown_lines() {
        let entries = vec![
            entry("Manga", 20, 4.0),
            entry("Manga", 5, 1.0),
            entry("Anime", 1, 13.0),
        ];
        let breakdown = breakdown_lines(&entries);
        assert!(breakdown.contains("Manga: 25 pages → 5 pts"));
        assert!(breakdown.contains("Anime: 1 episode → 13 pts"));
    }

    #[test]
    fn test_chart_input_parses_dates() {
        let entries = vec![entry("Manga", 20, 4.0)];
        let input = chart_input(&entries);
        assert_eq!(input.len(), 1);
        assert_eq!(input[0].1.to_string(), "2024-03-01");
    }
}
