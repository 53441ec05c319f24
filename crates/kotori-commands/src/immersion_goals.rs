//! Immersion goals: set, view, remove, clear.

use crate::framework::{is_log_channel, AppContext, Context, Error};
use chrono::{Duration as ChronoDuration, NaiveDateTime};
use kotori_common::utils::{
    discord_date, discord_relative, format_timestamp, parse_date, parse_timestamp, pluralize,
    progress_bar, utc_now,
};
use kotori_db::goals::GoalStatus;
use kotori_db::Db;
use kotori_media::MediaKind;
use poise::serenity_prelude as serenity;
use poise::serenity_prelude::AutocompleteChoice;
use serenity::{CreateEmbed, CreateEmbedFooter, Mentionable};

const MAX_EMBED_FIELDS: usize = 24;

/// Goal kind: progress counts points or logged amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum GoalType {
    #[name = "Points"]
    Points,
    #[name = "Amount"]
    Amount,
}

impl GoalType {
    pub fn db_name(&self) -> &'static str {
        match self {
            GoalType::Points => "points",
            GoalType::Amount => "amount",
        }
    }
}

/// Parse the goal deadline: either a number of hours from now or a
/// `YYYY-MM-DD` date, which must lie in the future.
pub fn parse_goal_end(input: &str, now: NaiveDateTime) -> Result<NaiveDateTime, &'static str> {
    if let Ok(hours) = input.trim().parse::<i64>() {
        return Ok(now + ChronoDuration::hours(hours));
    }
    let date = parse_date(input.trim())
        .ok_or("Invalid input. Please use either a number of hours or a date in YYYY-MM-DD format.")?;
    let end = date.and_time(chrono::NaiveTime::MIN);
    if end < now {
        return Err("The end date must be in the future.");
    }
    Ok(end)
}

/// Render one goal's status line: in progress, achieved, or failed.
pub fn format_goal_status(status: &GoalStatus, kind: MediaKind, now: NaiveDateTime) -> String {
    let unit = if status.goal_type == "amount" {
        pluralize(kind.unit_name(), status.goal_value)
    } else {
        "points".to_string()
    };
    let end = parse_timestamp(&status.end_date).unwrap_or(now);
    let created = parse_timestamp(&status.created_at).unwrap_or(now);
    let bar = progress_bar(status.progress, status.goal_value as f64);
    let media = kind.db_name();
    let progress = status.progress;
    let goal_value = status.goal_value;

    if progress >= goal_value as f64 {
        format!(
            "🎉 Congratulations! You've achieved your goal of `{goal_value}` {unit} for `{media}` \
             between {} and {}.",
            discord_date(created),
            discord_date(end)
        )
    } else if created <= now && now <= end {
        format!(
            "Goal in progress: `{progress}`/`{goal_value}` {unit} for `{media}`. {bar} - Ends {}.",
            discord_relative(end)
        )
    } else {
        format!(
            "⚠️ Goal failed: `{progress}`/`{goal_value}` {unit} for `{media}` by {}. {bar}",
            discord_relative(end)
        )
    }
}

/// Status lines for every goal a user holds on one media kind.
pub async fn goal_status_lines(
    db: &Db,
    user_id: i64,
    kind: MediaKind,
    now: NaiveDateTime,
) -> kotori_common::Result<Vec<String>> {
    let statuses = db.goal_statuses(user_id, kind.db_name()).await?;
    Ok(statuses
        .iter()
        .map(|status| format_goal_status(status, kind, now))
        .collect())
}

/// Set an immersion goal for yourself!
#[poise::command(slash_command)]
pub async fn log_set_goal(
    ctx: Context<'_>,
    #[description = "The type of media for which you want to set a goal."] media_type: MediaKind,
    #[description = "The type of goal, either points or amount."] goal_type: GoalType,
    #[description = "The goal value you want to achieve."]
    #[min = 1]
    goal_value: i64,
    #[description = "A date (YYYY-MM-DD) or a number of hours from now."] end_date_or_hours: String,
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

    let now = utc_now();
    let end = match parse_goal_end(&end_date_or_hours, now) {
        Ok(end) => end,
        Err(message) => {
            ctx.send(
                poise::CreateReply::default()
                    .content(message)
                    .ephemeral(true),
            )
            .await?;
            return Ok(());
        }
    };

    ctx.data()
        .db
        .insert_goal(
            ctx.author().id.get() as i64,
            media_type.db_name(),
            goal_type.db_name(),
            goal_value,
            &format_timestamp(end),
            &format_timestamp(now),
        )
        .await?;

    let unit = if goal_type == GoalType::Amount {
        pluralize(media_type.unit_name(), goal_value)
    } else {
        "points".to_string()
    };
    let embed = CreateEmbed::new()
        .title("Goal Set!")
        .colour(serenity::Colour::DARK_GREEN)
        .field("Media Type", media_type.db_name(), true)
        .field("Goal Type", format!("{goal_type:?}"), true)
        .field("Goal Value", format!("{goal_value} {unit}"), true)
        .field("End Date", discord_relative(end), true)
        .footer(
            CreateEmbedFooter::new(format!("Goal set by {}", ctx.author().display_name()))
                .icon_url(ctx.author().face()),
        );
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Autocomplete over the invoker's goals.
pub async fn goal_entry_autocomplete(ctx: AppContext<'_>, partial: &str) -> Vec<AutocompleteChoice> {
    let input = partial.trim().to_lowercase();
    let user_id = ctx.interaction.user.id.get() as i64;
    let Ok(goals) = ctx.data.db.user_goals(user_id).await else {
        return Vec::new();
    };

    let mut choices = Vec::new();
    for goal in goals {
        let end = parse_timestamp(&goal.end_date)
            .map(|ts| ts.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| goal.end_date.clone());
        let mut goal_type = goal.goal_type.clone();
        if let Some(first) = goal_type.get_mut(..1) {
            first.make_ascii_uppercase();
        }
        let label = format!(
            "{goal_type} goal of {} for {} by {end}",
            goal.goal_value, goal.media_type
        );
        if label.to_lowercase().contains(&input) {
            choices.push(AutocompleteChoice::new(label, goal.goal_id.to_string()));
        }
        if choices.len() >= 10 {
            break;
        }
    }
    choices
}

/// Remove one of your goals.
#[poise::command(slash_command)]
pub async fn log_remove_goal(
    ctx: Context<'_>,
    #[description = "Select the goal you want to remove."]
    #[autocomplete = "goal_entry_autocomplete"]
    goal_entry: String,
) -> Result<(), Error> {
    let Ok(goal_id) = goal_entry.parse::<i64>() else {
        ctx.send(
            poise::CreateReply::default()
                .content("Invalid goal entry selected.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };

    let user_id = ctx.author().id.get() as i64;
    let goals = ctx.data().db.user_goals(user_id).await?;
    let Some(goal) = goals.into_iter().find(|g| g.goal_id == goal_id) else {
        ctx.send(
            poise::CreateReply::default()
                .content("The selected goal entry does not exist or does not belong to you.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };

    ctx.data().db.delete_goal(goal_id, user_id).await?;

    let unit = match (goal.goal_type.as_str(), MediaKind::from_db_name(&goal.media_type)) {
        ("amount", Some(kind)) => pluralize(kind.unit_name(), goal.goal_value),
        _ => "points".to_string(),
    };
    ctx.say(format!(
        "> {} Your `{}` goal of `{} {unit}` for `{}` has been removed.",
        ctx.author().mention(),
        goal.goal_type,
        goal.goal_value,
        goal.media_type,
    ))
    .await?;
    Ok(())
}

/// View your current goals or the goals of another user.
#[poise::command(slash_command)]
pub async fn log_view_goals(
    ctx: Context<'_>,
    #[description = "The member whose goals you want to view (optional)."]
    member: Option<serenity::User>,
) -> Result<(), Error> {
    let target = member.as_ref().unwrap_or_else(|| ctx.author());
    let user_id = target.id.get() as i64;
    let now = utc_now();

    let mut embed = CreateEmbed::new()
        .title(format!("{}'s Goals", target.display_name()))
        .colour(serenity::Colour::BLUE);
    let mut fields_added = 0;
    for kind in MediaKind::ALL {
        for line in goal_status_lines(&ctx.data().db, user_id, kind, now).await? {
            if fields_added >= MAX_EMBED_FIELDS {
                embed = embed.field(
                    "Notice",
                    "You have reached the maximum number of fields. \
                     Please clear some of your goals to view more.",
                    false,
                );
                break;
            }
            embed = embed.field(format!("Goal {}", fields_added + 1), line, false);
            fields_added += 1;
        }
        if fields_added >= MAX_EMBED_FIELDS {
            break;
        }
    }

    if fields_added == 0 {
        ctx.send(
            poise::CreateReply::default()
                .content(format!("> {} has no active goals.", target.display_name()))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Clear all expired goals.
#[poise::command(slash_command)]
pub async fn log_clear_goals(ctx: Context<'_>) -> Result<(), Error> {
    let user_id = ctx.author().id.get() as i64;
    let now = format_timestamp(utc_now());
    let expired = ctx.data().db.expired_goals(user_id, &now).await?;

    if expired.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content("> You have no expired goals to clear.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    ctx.data().db.delete_expired_goals(user_id, &now).await?;

    let removed: Vec<String> = expired
        .iter()
        .map(|goal| {
            let ended = parse_timestamp(&goal.end_date)
                .map(discord_relative)
                .unwrap_or_else(|| goal.end_date.clone());
            format!(
                "- `{}` goal of `{}` for `{}` (ended {ended})",
                goal.goal_type, goal.goal_value, goal.media_type
            )
        })
        .collect();
    ctx.say(format!(
        "The following expired goals have been removed:\n{}",
        removed.join("\n")
    ))
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn test_parse_goal_end_hours() {
        let now = ts("2024-03-10 12:00:00");
        assert_eq!(parse_goal_end("5", now), Ok(ts("2024-03-10 17:00:00")));
    }

    #[test]
    fn test_parse_goal_end_date() {
        let now = ts("2024-03-10 12:00:00");
        assert_eq!(parse_goal_end("2024-04-01", now), Ok(ts("2024-04-01 00:00:00")));
        assert!(parse_goal_end("2024-03-01", now).is_err());
        assert!(parse_goal_end("soon", now).is_err());
    }

    #[test]
    fn test_format_goal_status_in_progress() {
        let status = GoalStatus {
            goal_id: 1,
            goal_type: "amount".to_string(),
            goal_value: 100,
            end_date: "2024-03-20 00:00:00".to_string(),
            created_at: "2024-03-01 00:00:00".to_string(),
            progress: 40.0,
        };
        let line = format_goal_status(&status, MediaKind::Manga, ts("2024-03-10 12:00:00"));
        assert!(line.contains("Goal in progress"));
        assert!(line.contains("`40`/`100` pages"));
        assert!(line.contains("(40%)"));
    }

    #[test]
    fn test_format_goal_status_achieved() {
        let status = GoalStatus {
            goal_id: 1,
            goal_type: "points".to_string(),
            goal_value: 50,
            end_date: "2024-03-20 00:00:00".to_string(),
            created_at: "2024-03-01 00:00:00".to_string(),
            progress: 55.0,
        };
        let line = format_goal_status(&status, MediaKind::Anime, ts("2024-03-10 12:00:00"));
        assert!(line.contains("Congratulations"));
        assert!(line.contains("points"));
    }

    #[test]
    fn test_format_goal_status_failed() {
        let status = GoalStatus {
            goal_id: 1,
            goal_type: "amount".to_string(),
            goal_value: 100,
            end_date: "2024-03-05 00:00:00".to_string(),
            created_at: "2024-03-01 00:00:00".to_string(),
            progress: 10.0,
        };
        let line = format_goal_status(&status, MediaKind::Manga, ts("2024-03-10 12:00:00"));
        assert!(line.contains("Goal failed"));
    }
}
