//! Selfmutes: voluntary timed mutes with role restore.

use crate::framework::{Context, Data, Error};
use chrono::Duration as ChronoDuration;
use kotori_common::utils::{format_timestamp, split_ids, utc_now};
use poise::serenity_prelude as serenity;
use serenity::{
    ComponentInteractionDataKind, CreateActionRow, CreateAllowedMentions,
    CreateInteractionResponse, CreateInteractionResponseMessage, CreateMessage, CreateSelectMenu,
    CreateSelectMenuKind, CreateSelectMenuOption, EditMember, Mentionable,
};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

/// Roles that can be saved and restored: not managed, not everyone,
/// not the booster role.
fn is_assignable(role: &serenity::Role, guild_id: serenity::GuildId) -> bool {
    role.id.get() != guild_id.get() && !role.managed && !role.tags.premium_subscriber
}

async fn guild_roles(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
) -> Result<HashMap<serenity::RoleId, serenity::Role>, Error> {
    let roles = ctx.http.get_guild_roles(guild_id).await?;
    Ok(roles.into_iter().map(|role| (role.id, role)).collect())
}

/// Replace a member's roles with the mute role, remembering the rest.
async fn perform_mute(
    ctx: &serenity::Context,
    data: &Data,
    member: &serenity::Member,
    mute_role_id: serenity::RoleId,
    end_time: chrono::NaiveDateTime,
) -> Result<(), Error> {
    let roles = guild_roles(ctx, member.guild_id).await?;
    let to_save: Vec<u64> = member
        .roles
        .iter()
        .filter(|id| {
            roles
                .get(id)
                .is_some_and(|role| is_assignable(role, member.guild_id))
        })
        .map(|id| id.get())
        .collect();

    data.db
        .store_mute(
            member.guild_id.get() as i64,
            member.user.id.get() as i64,
            mute_role_id.get() as i64,
            &kotori_common::utils::join_ids(&to_save),
            &format_timestamp(end_time),
        )
        .await?;

    member
        .guild_id
        .edit_member(
            &ctx.http,
            member.user.id,
            EditMember::new().roles(vec![mute_role_id]),
        )
        .await?;
    Ok(())
}

/// Strip selfmute roles and put saved roles back. Returns the restored roles.
pub async fn perform_unmute(
    ctx: &serenity::Context,
    data: &Data,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
) -> Result<Vec<serenity::RoleId>, Error> {
    let member = guild_id.member(&ctx.http, user_id).await?;
    let selfmute_roles: Vec<serenity::RoleId> = data
        .settings
        .selfmute_roles(guild_id.get())
        .iter()
        .map(|id| serenity::RoleId::new(*id))
        .collect();

    let kept: Vec<serenity::RoleId> = member
        .roles
        .iter()
        .filter(|id| !selfmute_roles.contains(id))
        .copied()
        .collect();
    guild_id
        .edit_member(&ctx.http, user_id, EditMember::new().roles(kept))
        .await?;

    let mute = data
        .db
        .user_mute(guild_id.get() as i64, user_id.get() as i64)
        .await?;
    let mut restored = Vec::new();
    if let Some(mute) = mute {
        let roles = guild_roles(ctx, guild_id).await?;
        restored = split_ids(&mute.roles_to_restore)
            .into_iter()
            .map(serenity::RoleId::new)
            .filter(|id| {
                roles
                    .get(id)
                    .is_some_and(|role| is_assignable(role, guild_id))
            })
            .collect();
        if !restored.is_empty() {
            member.add_roles(&ctx.http, &restored).await?;
        }
        data.db
            .remove_mute(guild_id.get() as i64, user_id.get() as i64)
            .await?;
    }
    Ok(restored)
}

/// Restore every mute whose timer ran out. Called from the minute sweep.
pub async fn sweep_expired(ctx: &serenity::Context, data: &Data) -> Result<(), Error> {
    let now = format_timestamp(utc_now());
    for mute in data.db.expired_mutes(&now).await? {
        let guild_id = serenity::GuildId::new(mute.guild_id as u64);
        let user_id = serenity::UserId::new(mute.user_id as u64);
        match perform_unmute(ctx, data, guild_id, user_id).await {
            Ok(restored) => {
                info!("Unmuted {user_id}, restored {} roles", restored.len());
            }
            Err(e) => {
                warn!("Could not unmute {user_id} in {guild_id}: {e}");
                // Member gone; drop the stale entry
                data.db.remove_mute(mute.guild_id, mute.user_id).await?;
            }
        }
    }
    Ok(())
}

/// Mute yourself for a specified amount of time.
#[poise::command(slash_command, guild_only)]
pub async fn selfmute(
    ctx: Context<'_>,
    #[description = "Hours to stay muted."]
    #[min = 0]
    hours: Option<i64>,
    #[description = "Minutes to stay muted."]
    #[min = 0]
    minutes: Option<i64>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();
    let configured = data.settings.selfmute_roles(guild_id.get());
    if configured.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content("This server has no selfmute roles configured.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let member = guild_id.member(ctx.http(), ctx.author().id).await?;
    if member
        .roles
        .iter()
        .any(|id| configured.contains(&id.get()))
    {
        ctx.send(
            poise::CreateReply::default()
                .content("You are already muted.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let hours = hours.unwrap_or(0);
    let minutes = minutes.unwrap_or(0);
    let end_time = utc_now() + ChronoDuration::hours(hours) + ChronoDuration::minutes(minutes);

    let roles = guild_roles(ctx.serenity_context(), guild_id).await?;
    let options: Vec<CreateSelectMenuOption> = configured
        .iter()
        .filter_map(|id| roles.get(&serenity::RoleId::new(*id)))
        .map(|role| CreateSelectMenuOption::new(role.name.clone(), role.id.to_string()))
        .collect();
    if options.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content("The configured selfmute roles no longer exist.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let menu_id = format!("selfmute_{}", ctx.id());
    let menu = CreateSelectMenu::new(menu_id.clone(), CreateSelectMenuKind::String { options });
    ctx.send(
        poise::CreateReply::default()
            .content("Select a role to mute yourself with.")
            .components(vec![CreateActionRow::SelectMenu(menu)])
            .ephemeral(true),
    )
    .await?;

    let Some(interaction) = serenity::ComponentInteractionCollector::new(ctx.serenity_context())
        .author_id(ctx.author().id)
        .filter(move |interaction| interaction.data.custom_id == menu_id)
        .timeout(Duration::from_secs(120))
        .await
    else {
        return Ok(());
    };

    let ComponentInteractionDataKind::StringSelect { values } = &interaction.data.kind else {
        return Ok(());
    };
    let Some(role_id) = values.first().and_then(|raw| raw.parse::<u64>().ok()) else {
        return Ok(());
    };

    perform_mute(
        ctx.serenity_context(),
        data,
        &member,
        serenity::RoleId::new(role_id),
        end_time,
    )
    .await?;

    interaction
        .create_response(
            ctx.http(),
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content("You are now muted.")
                    .ephemeral(true),
            ),
        )
        .await?;

    let held: Vec<String> = member
        .roles
        .iter()
        .filter_map(|id| roles.get(id))
        .filter(|role| role.id.get() != guild_id.get())
        .map(|role| role.mention().to_string())
        .collect();
    ctx.channel_id()
        .send_message(
            ctx.http(),
            CreateMessage::new()
                .content(format!(
                    "User {} has been muted for {hours} hours and {minutes} minutes.\n\
                     User had the following roles: {}",
                    ctx.author().mention(),
                    held.join(", ")
                ))
                .allowed_mentions(CreateAllowedMentions::new()),
        )
        .await?;
    Ok(())
}

/// Removes a mute from a user.
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn unmute_user(
    ctx: Context<'_>,
    #[description = "The user to unmute."] member: serenity::Member,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();
    let had_mute = data
        .db
        .user_mute(guild_id.get() as i64, member.user.id.get() as i64)
        .await?
        .is_some();

    let restored = perform_unmute(ctx.serenity_context(), data, guild_id, member.user.id).await?;

    if !had_mute {
        ctx.send(
            poise::CreateReply::default()
                .content("This user was not found in the muted data. Removing muted role.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    if !restored.is_empty() {
        let mentions: Vec<String> = restored.iter().map(|id| id.mention().to_string()).collect();
        ctx.channel_id()
            .send_message(
                ctx.http(),
                CreateMessage::new()
                    .content(format!(
                        "Unmuted {} and restored the following roles:\n{}",
                        member.user.mention(),
                        mentions.join(", ")
                    ))
                    .allowed_mentions(CreateAllowedMentions::new()),
            )
            .await?;
    }
    ctx.send(
        poise::CreateReply::default()
            .content(format!(
                "{} has been unmuted and roles restored when possible.",
                member.user.mention()
            ))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}
