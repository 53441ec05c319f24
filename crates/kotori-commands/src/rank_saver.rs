//! Rank saver: periodically snapshots member roles, restores them on rejoin.

use crate::framework::{Data, Error};
use kotori_common::utils::{join_ids, split_ids};
use poise::serenity_prelude as serenity;
use serenity::{CreateAllowedMentions, CreateMessage, Mentionable};
use tracing::{debug, info};

/// Ten-minute sweep: save every non-bot member's assignable roles.
pub async fn save_ranks(ctx: &serenity::Context, data: &Data) -> Result<(), Error> {
    let ignored = &data.settings.rank_saver.ignored_role_ids;

    for guild_id in ctx.cache.guilds() {
        // Snapshot from the cache without holding the guard across awaits
        let snapshots: Vec<(serenity::UserId, String)> = {
            let Some(guild) = ctx.cache.guild(guild_id) else {
                continue;
            };
            guild
                .members
                .iter()
                .filter(|(_, member)| !member.user.bot)
                .map(|(user_id, member)| {
                    let role_ids: Vec<u64> = member
                        .roles
                        .iter()
                        .map(|id| id.get())
                        .filter(|id| *id != guild_id.get() && !ignored.contains(id))
                        .collect();
                    (*user_id, join_ids(&role_ids))
                })
                .collect()
        };

        for (user_id, role_ids) in snapshots {
            data.db
                .save_user_ranks(guild_id.get() as i64, user_id.get() as i64, &role_ids)
                .await?;
        }
    }
    debug!("Rank snapshots saved");
    Ok(())
}

/// Member-join listener: restore previously saved roles.
pub async fn restore_ranks(
    ctx: &serenity::Context,
    data: &Data,
    member: &serenity::Member,
) -> Result<(), Error> {
    let Some(saved) = data
        .db
        .saved_user_ranks(member.guild_id.get() as i64, member.user.id.get() as i64)
        .await?
    else {
        return Ok(());
    };

    let ignored = &data.settings.rank_saver.ignored_role_ids;
    let guild_roles = ctx.http.get_guild_roles(member.guild_id).await?;
    let to_restore: Vec<serenity::RoleId> = split_ids(&saved)
        .into_iter()
        .filter(|id| !ignored.contains(id))
        .map(serenity::RoleId::new)
        .filter(|id| {
            guild_roles
                .iter()
                .any(|role| role.id == *id && !role.managed)
        })
        .collect();
    if to_restore.is_empty() {
        return Ok(());
    }

    info!("Restoring {} roles for {}", to_restore.len(), member.user.id);
    member.add_roles(&ctx.http, &to_restore).await?;

    let channel_id = data
        .settings
        .rank_announce_channel(member.guild_id.get())
        .map(serenity::ChannelId::new);
    let Some(channel_id) = channel_id else {
        return Ok(());
    };

    let mentions: Vec<String> = to_restore.iter().map(|id| id.mention().to_string()).collect();
    channel_id
        .send_message(
            &ctx.http,
            CreateMessage::new()
                .content(format!(
                    "**{} Rejoined:** Restored the following roles: **{}**",
                    member.user.mention(),
                    mentions.join(", ")
                ))
                .allowed_mentions(CreateAllowedMentions::new()),
        )
        .await?;
    Ok(())
}
