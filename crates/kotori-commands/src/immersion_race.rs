//! Animated leaderboard race over a date range.

use crate::framework::{is_log_channel, Context, Error};
use crate::usernames::get_username;
use kotori_charts::{cumulative_standings, render_race_gif};
use kotori_common::utils::{parse_date, parse_timestamp};
use kotori_media::MediaKind;
use poise::serenity_prelude as serenity;
use serenity::CreateAttachment;
use std::collections::HashMap;

const MAX_RANGE_DAYS: i64 = 31;

/// What the racers accumulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum RaceType {
    #[name = "Points"]
    Points,
    #[name = "Amount"]
    Amount,
}

/// Generate a bar chart race visualization of immersion progress!
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MANAGE_MESSAGES"
)]
pub async fn log_race(
    ctx: Context<'_>,
    #[description = "Start date (YYYY-MM-DD)"] from_date: String,
    #[description = "End date (YYYY-MM-DD)"] to_date: String,
    #[description = "Optional: Filter by media type"] media_type: Option<MediaKind>,
    #[description = "Optional: Race by points or amount"] race_type: Option<RaceType>,
) -> Result<(), Error> {
    if !is_log_channel(&ctx) {
        ctx.send(
            poise::CreateReply::default()
                .content("You can only use this command in DM or in the log channels.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let (Some(from), Some(to)) = (parse_date(&from_date), parse_date(&to_date)) else {
        ctx.send(
            poise::CreateReply::default()
                .content("Invalid date format. Please use YYYY-MM-DD.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };
    if to < from {
        ctx.send(
            poise::CreateReply::default()
                .content("End date must be after start date.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }
    if (to - from).num_days() > MAX_RANGE_DAYS {
        ctx.send(
            poise::CreateReply::default()
                .content("Date range must be 31 days or less.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    ctx.defer().await?;

    let race_type = race_type.unwrap_or(RaceType::Points);
    let data = ctx.data();
    let entries = data
        .db
        .logs_for_race(
            &format!("{from} 00:00:00"),
            &format!("{to} 23:59:59"),
            media_type.map(|kind| kind.db_name()),
        )
        .await?;
    if entries.is_empty() {
        ctx.say("No logs found for the specified period.").await?;
        return Ok(());
    }

    // Resolve every participant's name once
    let mut names: HashMap<i64, String> = HashMap::new();
    for entry in &entries {
        if !names.contains_key(&entry.user_id) {
            let name = get_username(
                ctx.serenity_context(),
                data,
                serenity::UserId::new(entry.user_id as u64),
            )
            .await;
            names.insert(entry.user_id, name);
        }
    }

    let logs: Vec<(String, chrono::NaiveDate, f64)> = entries
        .iter()
        .filter_map(|entry| {
            let date = parse_timestamp(&entry.log_date)?.date();
            let value = match race_type {
                RaceType::Points => entry.points_received,
                RaceType::Amount => entry.amount_logged as f64,
            };
            let name = names.get(&entry.user_id)?.clone();
            Some((name, date, value))
        })
        .collect();

    let title = match race_type {
        RaceType::Points => "Immersion Points",
        RaceType::Amount => "Immersion Amount",
    };
    let frames = cumulative_standings(&logs, from, to);
    let gif = tokio::task::spawn_blocking(move || render_race_gif(&frames, title))
        .await
        .map_err(|e| kotori_common::KotoriError::new(format!("Chart task failed: {e}")))??;

    let caption = format!(
        "Bar chart race for {from} to {to}{}",
        media_type
            .map(|kind| format!(" ({})", kind.db_name()))
            .unwrap_or_default()
    );
    ctx.send(
        poise::CreateReply::default()
            .content(caption)
            .attachment(CreateAttachment::bytes(gif, "race.gif")),
    )
    .await?;
    Ok(())
}
