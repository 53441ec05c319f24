//! Auto-receive roles: holders of one role automatically get another.

use crate::framework::{Context, Data, Error};
use poise::serenity_prelude as serenity;
use serenity::Mentionable;
use std::time::Duration;
use tracing::{debug, info};

/// Add a role that should automatically receive another role.
#[poise::command(
    slash_command,
    guild_only,
    rename = "_add_auto_receive",
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn add_auto_receive(
    ctx: Context<'_>,
    #[description = "The role that should have the role to get."] role_to_have: serenity::Role,
    #[description = "The role that should be given to the role to have."]
    role_to_get: serenity::Role,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let inserted = ctx
        .data()
        .db
        .add_auto_receive_pair(
            guild_id.get() as i64,
            role_to_have.id.get() as i64,
            &role_to_have.name,
            role_to_get.id.get() as i64,
            &role_to_get.name,
        )
        .await?;

    let content = if inserted {
        format!(
            "Added {} as a role that should automatically receive {}.",
            role_to_have.mention(),
            role_to_get.mention()
        )
    } else {
        format!(
            "{} already automatically receives {}.",
            role_to_have.mention(),
            role_to_get.mention()
        )
    };
    ctx.send(poise::CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

/// Remove a role that should automatically receive another role.
#[poise::command(
    slash_command,
    guild_only,
    rename = "_remove_auto_receive",
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn remove_auto_receive(
    ctx: Context<'_>,
    #[description = "The role that should have the role to get."] role_to_have: serenity::Role,
    #[description = "The role that should be given to the role to have."]
    role_to_get: serenity::Role,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    ctx.data()
        .db
        .remove_auto_receive_pair(
            guild_id.get() as i64,
            role_to_have.id.get() as i64,
            role_to_get.id.get() as i64,
        )
        .await?;
    ctx.send(
        poise::CreateReply::default()
            .content(format!(
                "Removed {} as a role that should automatically receive {}.",
                role_to_have.mention(),
                role_to_get.mention()
            ))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Ban a member from automatically receiving roles.
#[poise::command(
    slash_command,
    guild_only,
    rename = "_ban_auto_receive",
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn ban_auto_receive(
    ctx: Context<'_>,
    #[description = "The member that should be banned."] member: serenity::Member,
    #[description = "The role that should no longer be given."] role: serenity::Role,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    if member.roles.contains(&role.id) {
        member.remove_role(ctx.http(), role.id).await?;
    }

    let inserted = ctx
        .data()
        .db
        .ban_auto_receive(
            guild_id.get() as i64,
            member.user.id.get() as i64,
            &member.user.name,
            role.id.get() as i64,
            &role.name,
        )
        .await?;

    let content = if inserted {
        format!(
            "Banned {} from automatically getting the role {}.",
            member.user.mention(),
            role.mention()
        )
    } else {
        format!(
            "{} is already banned from getting the role {}.",
            member.user.mention(),
            role.mention()
        )
    };
    ctx.send(poise::CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

/// Unban a member from automatically receiving roles (lifts every ban).
#[poise::command(
    slash_command,
    guild_only,
    rename = "_unban_auto_receive",
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn unban_auto_receive(
    ctx: Context<'_>,
    #[description = "The member that should be unbanned."] member: serenity::Member,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    ctx.data()
        .db
        .unban_auto_receive(guild_id.get() as i64, member.user.id.get() as i64)
        .await?;
    ctx.send(
        poise::CreateReply::default()
            .content(format!(
                "Unbanned {} from automatically receiving roles.",
                member.user.name
            ))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Minute sweep: grant target roles to every holder of a source role.
pub async fn give_auto_roles(ctx: &serenity::Context, data: &Data) -> Result<(), Error> {
    for guild_id in ctx.cache.guilds() {
        let pairs = data.db.auto_receive_pairs(guild_id.get() as i64).await?;
        if pairs.is_empty() {
            continue;
        }
        let bans = data.db.auto_receive_bans(guild_id.get() as i64).await?;

        for pair in pairs {
            // Collect holders from the cache without holding the guard
            // across awaits.
            let holders: Option<Vec<(serenity::UserId, bool)>> = {
                let Some(guild) = ctx.cache.guild(guild_id) else {
                    continue;
                };
                let have = serenity::RoleId::new(pair.role_id_to_have as u64);
                let get = serenity::RoleId::new(pair.role_id_to_get as u64);
                if !guild.roles.contains_key(&have) || !guild.roles.contains_key(&get) {
                    None
                } else {
                    Some(
                        guild
                            .members
                            .iter()
                            .filter(|(_, member)| member.roles.contains(&have))
                            .map(|(user_id, member)| (*user_id, member.roles.contains(&get)))
                            .collect(),
                    )
                }
            };

            let Some(holders) = holders else {
                // One of the pair's roles is gone
                data.db
                    .remove_auto_receive_pair(
                        guild_id.get() as i64,
                        pair.role_id_to_have,
                        pair.role_id_to_get,
                    )
                    .await?;
                continue;
            };

            let banned: Vec<i64> = bans
                .iter()
                .filter(|ban| ban.role_id == pair.role_id_to_get)
                .map(|ban| ban.user_id)
                .collect();

            for (user_id, already_has) in holders {
                if already_has {
                    continue;
                }
                if banned.contains(&(user_id.get() as i64)) {
                    debug!("Skipping banned user {user_id} for auto-receive");
                    continue;
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
                if let Err(e) = ctx
                    .http
                    .add_member_role(
                        guild_id,
                        user_id,
                        serenity::RoleId::new(pair.role_id_to_get as u64),
                        Some("Auto-receive role"),
                    )
                    .await
                {
                    debug!("Cannot auto-assign role to {user_id}: {e}");
                } else {
                    info!("Gave {user_id} the auto-receive role {}", pair.role_id_to_get);
                }
            }
        }
    }
    Ok(())
}
