//! Immersion logging: `/log` and its companion commands.

use crate::achievements;
use crate::catalog_search::{resolve_source_url, resolve_thumbnail, resolve_title};
use crate::framework::{is_log_channel, AppContext, Context, Error};
use crate::immersion_goals::goal_status_lines;
use crate::usernames::get_username;
use chrono::{Duration as ChronoDuration, NaiveDate};
use kotori_common::utils::{self, format_timestamp, parse_date, pluralize, utc_now};
use kotori_config::settings::Multipliers;
use kotori_media::MediaKind;
use poise::serenity_prelude as serenity;
use poise::serenity_prelude::AutocompleteChoice;
use rand::seq::SliceRandom;
use serenity::{CreateAttachment, CreateEmbed, CreateEmbedFooter, Mentionable};

/// Maximum embed fields before goal lines get cut off with a notice.
const MAX_EMBED_FIELDS: usize = 24;

/// Per-unit multiplier for a media kind.
pub fn multiplier_for(kind: MediaKind, multipliers: &Multipliers) -> f64 {
    match kind {
        MediaKind::VisualNovel => multipliers.visual_novel,
        MediaKind::Manga => multipliers.manga,
        MediaKind::Anime => multipliers.anime,
        MediaKind::Book => multipliers.book,
        MediaKind::ReadingTime => multipliers.reading_time,
        MediaKind::ListeningTime => multipliers.listening_time,
        MediaKind::Reading => multipliers.reading,
    }
}

/// Length of the run of consecutive days ending today, given distinct log
/// dates ordered newest first.
pub fn consecutive_days(dates: &[NaiveDate], today: NaiveDate) -> i64 {
    let mut streak = 0i64;
    for date in dates {
        if *date == today - ChronoDuration::days(streak) {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

/// Render the points delta together with the multiplier it came from.
pub fn points_line(points: f64, multiplier: f64) -> String {
    if multiplier < 1.0 {
        let needed_for_one = (1.0 / multiplier).round() as i64;
        format!("`+{points}` (X/{needed_for_one})")
    } else {
        let received_for_one = multiplier.round() as i64;
        format!("`+{points}` (X*{received_for_one})")
    }
}

/// Validate a backfill date: `YYYY-MM-DD`, not in the future, at most
/// seven days back.
pub fn validate_backfill(input: &str, today: NaiveDate) -> Result<NaiveDate, &'static str> {
    let date = parse_date(input).ok_or("Invalid date format. Please use YYYY-MM-DD.")?;
    if date > today {
        return Err("You cannot log a date in the future.");
    }
    if (today - date).num_days() > 7 {
        return Err("You cannot log a date more than 7 days in the past.");
    }
    Ok(date)
}

async fn random_guild_emoji(ctx: &Context<'_>) -> String {
    let Some(guild_id) = ctx.guild_id() else {
        return String::new();
    };
    let emojis = guild_id.emojis(ctx.http()).await.unwrap_or_default();
    emojis
        .choose(&mut rand::thread_rng())
        .map(|emoji| emoji.to_string())
        .unwrap_or_default()
}

/// Log your immersion!
#[poise::command(slash_command)]
pub async fn log(
    ctx: Context<'_>,
    #[description = "The type of media you are logging."] media_type: MediaKind,
    #[description = "Amount. For time-based logs, use the number of minutes."] amount: String,
    #[description = "VNDB/AniList ID or title, TMDB title for listening, or free text."]
    #[autocomplete = "crate::catalog_search::log_name_autocomplete"]
    name: Option<String>,
    #[description = "Short comment about your log."] comment: Option<String>,
    #[description = "The date for the log (YYYY-MM-DD), at most 7 days in the past."]
    backfill_date: Option<String>,
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

    let Ok(amount) = amount.trim().parse::<i64>() else {
        ctx.send(
            poise::CreateReply::default()
                .content("Amount must be a valid number.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };
    if amount < 0 {
        ctx.send(
            poise::CreateReply::default()
                .content("Amount must be a positive number.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }
    if amount > media_type.max_logged() {
        ctx.send(
            poise::CreateReply::default()
                .content(format!(
                    "Amount must be less than {} for `{}`.",
                    media_type.max_logged(),
                    poise::ChoiceParameter::name(&media_type)
                ))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let name = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    if let Some(name) = &name {
        if name.chars().count() > 150 {
            ctx.send(
                poise::CreateReply::default()
                    .content("Name must be less than 150 characters.")
                    .ephemeral(true),
            )
            .await?;
            return Ok(());
        }
    }
    let comment = comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if let Some(comment) = &comment {
        if comment.chars().count() > 200 {
            ctx.send(
                poise::CreateReply::default()
                    .content("Comment must be less than 200 characters.")
                    .ephemeral(true),
            )
            .await?;
            return Ok(());
        }
    }

    let now = utc_now();
    let log_date = match &backfill_date {
        None => now,
        Some(input) => match validate_backfill(input, now.date()) {
            Ok(date) => date.and_time(chrono::NaiveTime::MIN),
            Err(message) => {
                ctx.send(
                    poise::CreateReply::default()
                        .content(message)
                        .ephemeral(true),
                )
                .await?;
                return Ok(());
            }
        },
    };

    ctx.defer().await?;

    let data = ctx.data();
    let user_id = ctx.author().id.get() as i64;
    let multiplier = multiplier_for(media_type, &data.settings.immersion.multipliers);
    let points = media_type.points_for(amount, multiplier);
    let group = media_type.achievement_group();
    let month = now.format("%Y-%m").to_string();

    let month_points_before = data.db.points_for_month(user_id, &month).await?;
    data.db
        .insert_log(
            user_id,
            media_type.db_name(),
            name.as_deref(),
            comment.as_deref(),
            amount,
            points,
            &format_timestamp(log_date),
            group.as_str(),
        )
        .await?;
    let month_points_after = data.db.points_for_month(user_id, &month).await?;

    let goal_lines = goal_status_lines(&data.db, user_id, media_type, now).await?;
    let group_total = data
        .db
        .points_for_achievement_group(user_id, group.as_str())
        .await?;
    let progress = achievements::progress_after_log(group.as_str(), group_total, points);

    let streak = consecutive_days(
        &data
            .db
            .distinct_log_dates(user_id)
            .await?
            .iter()
            .filter_map(|d| parse_date(d))
            .collect::<Vec<_>>(),
        now.date(),
    );

    let emoji = random_guild_emoji(&ctx).await;
    let title = format!(
        "Logged {amount} {} of {} {emoji}",
        pluralize(media_type.unit_name(), amount),
        media_type.db_name()
    );

    let (display_title, thumbnail, source_url) = match &name {
        Some(name) => (
            resolve_title(data, media_type, name).await,
            resolve_thumbnail(data, media_type, name).await,
            resolve_source_url(data, media_type, name).await,
        ),
        None => (media_type.db_name().to_string(), None, None),
    };

    let mut embed = CreateEmbed::new()
        .title(title)
        .description(match &source_url {
            Some(url) => format!("[{display_title}]({url})"),
            None => display_title,
        })
        .colour(serenity::Colour::from_rgb(
            rand::random(),
            rand::random(),
            rand::random(),
        ))
        .field("Comment", comment.as_deref().unwrap_or("No comment"), false)
        .field("Points Received", points_line(points, multiplier), true)
        .field(
            "Total Points/Month",
            format!("`{month_points_before}` → `{month_points_after}`"),
            true,
        )
        .field("Streak", format!("{streak} {}", pluralize("day", streak)), true);

    let mut field_count = 4;
    if let Some(reached) = &progress.reached {
        embed = embed.field("Achievement Reached! 🎉", reached, false);
        field_count += 1;
    }
    if let Some(next) = &progress.next {
        embed = embed.field("Next Achievement", next, false);
        field_count += 1;
    }
    for (i, line) in goal_lines.iter().enumerate() {
        if field_count >= MAX_EMBED_FIELDS {
            embed = embed.field(
                "Notice",
                "You have reached the maximum number of fields. \
                 Please clear some of your goals to view more.",
                false,
            );
            break;
        }
        embed = embed.field(format!("Goal {}", i + 1), line, false);
        field_count += 1;
    }

    if let Some(url) = thumbnail {
        embed = embed.thumbnail(url);
    }
    embed = embed.footer(
        CreateEmbedFooter::new(format!(
            "Logged by {} for {}",
            ctx.author().display_name(),
            log_date.date()
        ))
        .icon_url(ctx.author().face()),
    );

    let handle = ctx.send(poise::CreateReply::default().embed(embed)).await?;

    // A bare URL in the name or comment gets quoted under the embed so
    // Discord unfurls it.
    let url_to_quote = [name.as_deref(), comment.as_deref()]
        .into_iter()
        .flatten()
        .find(|text| text.starts_with("http://") || text.starts_with("https://"));
    if let Some(url) = url_to_quote {
        let message = handle.message().await?;
        message.reply(ctx.http(), format!("> {url}")).await?;
    }

    Ok(())
}

/// Autocomplete over the invoker's own logs, newest first.
pub async fn log_undo_autocomplete(ctx: AppContext<'_>, partial: &str) -> Vec<AutocompleteChoice> {
    let input = partial.trim().to_lowercase();
    let user_id = ctx.interaction.user.id.get() as i64;
    let Ok(logs) = ctx.data.db.user_logs(user_id).await else {
        return Vec::new();
    };

    let mut choices = Vec::new();
    for entry in logs {
        let Some(kind) = MediaKind::from_db_name(&entry.media_type) else {
            continue;
        };
        let date = entry.log_date.split(' ').next().unwrap_or(&entry.log_date);
        let label = utils::truncate(
            &format!(
                "{}: {} ({} {}) on {date}",
                entry.media_type,
                entry.media_name.as_deref().unwrap_or("N/A"),
                entry.amount_logged,
                kind.unit_name(),
            ),
            100,
        );
        if label.to_lowercase().contains(&input) {
            choices.push(AutocompleteChoice::new(label, entry.log_id.to_string()));
        }
        if choices.len() >= 10 {
            break;
        }
    }
    choices
}

/// Undo a previous immersion log!
#[poise::command(slash_command)]
pub async fn log_undo(
    ctx: Context<'_>,
    #[description = "Select the log entry you want to undo."]
    #[autocomplete = "log_undo_autocomplete"]
    log_entry: String,
) -> Result<(), Error> {
    let Ok(log_id) = log_entry.parse::<i64>() else {
        ctx.send(
            poise::CreateReply::default()
                .content("Invalid log entry selected.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };

    let user_id = ctx.author().id.get() as i64;
    let logs = ctx.data().db.user_logs(user_id).await?;
    let Some(entry) = logs.into_iter().find(|l| l.log_id == log_id) else {
        ctx.send(
            poise::CreateReply::default()
                .content("The selected log entry does not exist or does not belong to you.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };

    ctx.data().db.delete_log(log_id, user_id).await?;

    let unit = MediaKind::from_db_name(&entry.media_type)
        .map(|kind| kind.unit_name())
        .unwrap_or("unit");
    let date = entry.log_date.split(' ').next().unwrap_or(&entry.log_date);
    ctx.say(format!(
        "> {} Your log for `{} {unit}` of `{}` (`{}`) on `{date}` has been deleted.",
        ctx.author().mention(),
        entry.amount_logged,
        entry.media_type,
        entry.media_name.as_deref().unwrap_or("No Name"),
    ))
    .await?;
    Ok(())
}

/// Display all your achievements!
#[poise::command(slash_command)]
pub async fn log_achievements(ctx: Context<'_>) -> Result<(), Error> {
    let user_id = ctx.author().id.get() as i64;
    let mut lines = Vec::new();

    for group in kotori_media::AchievementGroup::ALL {
        let total = ctx
            .data()
            .db
            .points_for_achievement_group(user_id, group.as_str())
            .await?;
        let (reached, next) = achievements::summary_lines(group.as_str(), total);
        if let Some(reached) = reached {
            lines.push(reached);
        }
        if let Some(next) = next {
            lines.push(next);
        }
        lines.push("\n---------\n".to_string());
    }

    let description = if lines.is_empty() {
        "No achievements yet. Keep immersing!".to_string()
    } else {
        lines.join("\n")
    };

    let embed = CreateEmbed::new()
        .title(format!("{}'s Achievements", ctx.author().display_name()))
        .description(description)
        .colour(serenity::Colour::GOLD);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Export immersion logs as a CSV file.
#[poise::command(slash_command)]
pub async fn log_export(
    ctx: Context<'_>,
    #[description = "The user to export logs for (optional)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let target = user.as_ref().unwrap_or_else(|| ctx.author());
    let user_id = target.id.get() as i64;
    let logs = ctx.data().db.export_logs(user_id).await?;

    if logs.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content("No logs to export for the specified user.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let mut csv = String::from(
        "Log ID,Media Type,Media Name,Comment,Amount Logged,Points Received,Log Date\n",
    );
    for entry in &logs {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            entry.log_id,
            utils::csv_escape(&entry.media_type),
            utils::csv_escape(entry.media_name.as_deref().unwrap_or("N/A")),
            utils::csv_escape(entry.comment.as_deref().unwrap_or("No comment")),
            entry.amount_logged,
            entry.points_received,
            utils::csv_escape(&entry.log_date),
        ));
    }

    ctx.send(
        poise::CreateReply::default()
            .content("Here are the immersion logs:")
            .attachment(CreateAttachment::bytes(
                csv.into_bytes(),
                format!("immersion_logs_{user_id}.csv"),
            )),
    )
    .await?;
    Ok(())
}

/// Output your immersion logs as a text file.
#[poise::command(slash_command)]
pub async fn logs(
    ctx: Context<'_>,
    #[description = "The user to export logs for (optional)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    ctx.defer().await?;
    let target = user.as_ref().unwrap_or_else(|| ctx.author());
    let user_id = target.id.get() as i64;
    let entries = ctx.data().db.export_logs(user_id).await?;

    if entries.is_empty() {
        ctx.say("No logs to export for the specified user.").await?;
        return Ok(());
    }

    let mut text = String::new();
    for entry in &entries {
        let date = entry.log_date.split(' ').next().unwrap_or(&entry.log_date);
        let unit = MediaKind::from_db_name(&entry.media_type)
            .map(|kind| pluralize(kind.unit_name(), entry.amount_logged))
            .unwrap_or_else(|| "units".to_string());
        text.push_str(&format!(
            "{date}: {} ({}) -> {} {unit} | {}\n",
            entry.media_type,
            entry.media_name.as_deref().unwrap_or("N/A"),
            entry.amount_logged,
            entry.comment.as_deref().unwrap_or("No comment"),
        ));
    }

    ctx.send(
        poise::CreateReply::default()
            .content("Here are your immersion logs:")
            .attachment(CreateAttachment::bytes(
                text.into_bytes(),
                format!("immersion_logs_{user_id}.txt"),
            )),
    )
    .await?;
    Ok(())
}

/// Display the immersion leaderboard.
#[poise::command(slash_command)]
pub async fn log_leaderboard(
    ctx: Context<'_>,
    #[description = "Optionally specify the media type for leaderboard filtering."]
    media_type: Option<MediaKind>,
    #[description = "Optionally specify the month in YYYY-MM format or \"ALL\"."]
    month: Option<String>,
) -> Result<(), Error> {
    ctx.defer().await?;

    let month = match month {
        None => utc_now().format("%Y-%m").to_string(),
        Some(month) if month == "ALL" => month,
        Some(month) => {
            if parse_date(&format!("{month}-01")).is_none() {
                ctx.say("Invalid month format. Please use YYYY-MM.").await?;
                return Ok(());
            }
            month
        }
    };

    let data = ctx.data();
    let media_name = media_type.map(|kind| kind.db_name());
    let board = data.db.monthly_leaderboard(&month, media_name).await?;
    let invoker_id = ctx.author().id.get() as i64;
    let (own_points, own_amount) = data
        .db
        .user_month_totals(invoker_id, &month, media_name)
        .await?;

    let mut title = format!(
        "Immersion Leaderboard - {}",
        if month == "ALL" {
            "All Time".to_string()
        } else {
            parse_date(&format!("{month}-01"))
                .map(|d| d.format("%B %Y").to_string())
                .unwrap_or_else(|| month.clone())
        }
    );
    if let Some(kind) = media_type {
        title.push_str(&format!(" for {}", kind.db_name()));
    }

    let unit = media_type.map(|kind| kind.unit_name());
    let mut embed = CreateEmbed::new().title(title).colour(serenity::Colour::BLUE);

    let mut invoker_on_board = false;
    if board.is_empty() {
        embed = embed
            .description("No logs available for this month. Start immersing to be on the leaderboard!");
    }
    for (rank, entry) in board.iter().enumerate() {
        let name = get_username(
            ctx.serenity_context(),
            data,
            serenity::UserId::new(entry.user_id as u64),
        )
        .await;
        let amount_line = unit
            .map(|u| format!("\n{} {}", entry.total_amount, pluralize(u, entry.total_amount)))
            .unwrap_or_default();
        if entry.user_id == invoker_id {
            invoker_on_board = true;
            embed = embed.field(
                format!("**{}. {name} (YOU)**", rank + 1),
                format!("**{} points**{amount_line}", entry.total_points),
                true,
            );
        } else {
            embed = embed.field(
                format!("{}. {name}", rank + 1),
                format!("{} points{amount_line}", entry.total_points),
                true,
            );
        }
    }

    if !invoker_on_board && own_points > 0.0 {
        let amount_line = unit
            .map(|u| format!("\n{} {}", own_amount, pluralize(u, own_amount)))
            .unwrap_or_default();
        embed = embed.field("**You**", format!("**{own_points} points**{amount_line}"), true);
    } else if !invoker_on_board {
        embed = embed.field("**You**", "**0 points**", true);
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_consecutive_days() {
        let today = date("2024-03-10");
        let dates = vec![date("2024-03-10"), date("2024-03-09"), date("2024-03-07")];
        assert_eq!(consecutive_days(&dates, today), 2);

        // Gap at the start: streak is zero
        let dates = vec![date("2024-03-08")];
        assert_eq!(consecutive_days(&dates, today), 0);

        assert_eq!(consecutive_days(&[], today), 0);
    }

    #[test]
    fn test_points_line() {
        assert_eq!(points_line(2.86, 1.0 / 350.0), "`+2.86` (X/350)");
        assert_eq!(points_line(26.0, 13.0), "`+26` (X*13)");
        assert_eq!(points_line(5.0, 1.0), "`+5` (X*1)");
    }

    #[test]
    fn test_validate_backfill() {
        let today = date("2024-03-10");
        assert_eq!(validate_backfill("2024-03-08", today), Ok(date("2024-03-08")));
        assert_eq!(validate_backfill("2024-03-10", today), Ok(today));
        assert!(validate_backfill("2024-03-11", today).is_err());
        assert!(validate_backfill("2024-03-02", today).is_err());
        assert!(validate_backfill("03/10/2024", today).is_err());
        // Exactly seven days back is allowed
        assert_eq!(validate_backfill("2024-03-03", today), Ok(date("2024-03-03")));
    }

    #[test]
    fn test_multiplier_for_maps_kinds() {
        let multipliers = Multipliers::default();
        assert!((multiplier_for(MediaKind::Manga, &multipliers) - 0.2).abs() < f64::EPSILON);
        assert!((multiplier_for(MediaKind::Anime, &multipliers) - 13.0).abs() < f64::EPSILON);
    }
}
