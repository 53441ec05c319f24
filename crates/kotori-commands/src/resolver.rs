//! Help-thread resolution: `/solved` plus an idle-thread nag.

use crate::framework::{Context, Data, Error};
use chrono::Duration as ChronoDuration;
use kotori_common::utils::utc_now;
use poise::serenity_prelude as serenity;
use serenity::{ChannelType, EditThread, Mentionable};
use tracing::{debug, warn};

const SOLVED_PREFIX: &str = "[SOLVED]";
const IDLE_HOURS: i64 = 24;

/// Marks a thread as solved.
#[poise::command(slash_command, guild_only)]
pub async fn solved(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let forums = ctx.data().settings.help_forums(guild_id.get());
    if forums.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content("This server does not have any help channels set up.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let channel = ctx
        .http()
        .get_channel(ctx.channel_id())
        .await?
        .guild()
        .filter(|channel| {
            matches!(
                channel.kind,
                ChannelType::PublicThread | ChannelType::PrivateThread
            )
        });
    let Some(thread) = channel else {
        ctx.send(
            poise::CreateReply::default()
                .content("This command can only be used in a help thread.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };

    if !thread
        .parent_id
        .is_some_and(|parent| forums.contains(&parent.get()))
    {
        ctx.send(
            poise::CreateReply::default()
                .content("This channel is not a help channel.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let already_solved = thread.name.contains(SOLVED_PREFIX);
    let archived = thread
        .thread_metadata
        .map(|meta| meta.archived)
        .unwrap_or(false);
    if already_solved && archived {
        ctx.send(
            poise::CreateReply::default()
                .content("This thread is already marked as solved.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }
    ctx.say(format!("{} closed the thread.", ctx.author().name))
        .await?;

    let new_name = if already_solved {
        thread.name.clone()
    } else {
        format!("{SOLVED_PREFIX} {}", thread.name)
    };
    ctx.channel_id()
        .edit_thread(
            ctx.http(),
            EditThread::new()
                .name(new_name)
                .archived(true)
                .audit_log_reason(&format!("Marked as solved by {}", ctx.author().name)),
        )
        .await?;
    Ok(())
}

/// Hourly sweep: nag unarchived help threads idle for over a day.
pub async fn ask_if_solved(ctx: &serenity::Context, data: &Data) -> Result<(), Error> {
    let now = utc_now();
    for guild_id in ctx.cache.guilds() {
        let forums = data.settings.help_forums(guild_id.get());
        if forums.is_empty() {
            continue;
        }

        let active = match ctx.http.get_guild_active_threads(guild_id).await {
            Ok(threads) => threads,
            Err(e) => {
                warn!("Could not list active threads for {guild_id}: {e}");
                continue;
            }
        };

        for thread in active.threads {
            if !thread
                .parent_id
                .is_some_and(|parent| forums.contains(&parent.get()))
            {
                continue;
            }
            if thread.name.contains(SOLVED_PREFIX) {
                continue;
            }
            if thread
                .thread_metadata
                .map(|meta| meta.archived)
                .unwrap_or(false)
            {
                continue;
            }
            // Snowflake of the last message doubles as its timestamp
            let Some(last_message_id) = thread.last_message_id else {
                continue;
            };
            let age = now.and_utc().timestamp() - last_message_id.created_at().timestamp();
            if age < ChronoDuration::hours(IDLE_HOURS).num_seconds() {
                continue;
            }

            let owner_mention = thread
                .owner_id
                .map(|owner| owner.mention().to_string())
                .unwrap_or_default();
            if let Err(e) = thread
                .id
                .say(
                    &ctx.http,
                    format!(
                        "{owner_mention} has your problem been solved? If so, do \
                         ``/solved`` to close this thread."
                    ),
                )
                .await
            {
                debug!("Could not nag thread {}: {e}", thread.id);
            }
        }
    }
    Ok(())
}
