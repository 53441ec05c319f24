//! Scheduled event roles: create, sync membership, clean up.

use crate::framework::{Data, Error};
use poise::serenity_prelude as serenity;
use serenity::{EditRole, ScheduledEventStatus};
use tracing::{debug, info, warn};

fn is_finished(status: &ScheduledEventStatus) -> bool {
    matches!(
        status,
        ScheduledEventStatus::Completed | ScheduledEventStatus::Canceled
    )
}

/// Create the mentionable role for an event and hand it to everyone
/// already interested.
pub async fn create_event_role(
    ctx: &serenity::Context,
    data: &Data,
    event: &serenity::ScheduledEvent,
) -> Result<Option<serenity::Role>, Error> {
    let role = match event
        .guild_id
        .create_role(
            &ctx.http,
            EditRole::new()
                .name(format!("Event: {}", event.name))
                .mentionable(true)
                .audit_log_reason("Event role creation"),
        )
        .await
    {
        Ok(role) => role,
        Err(e) => {
            warn!(
                "Missing permissions to create event role in {}: {e}",
                event.guild_id
            );
            return Ok(None);
        }
    };

    data.db
        .upsert_event_role(
            event.guild_id.get() as i64,
            event.id.get() as i64,
            role.id.get() as i64,
        )
        .await?;

    let interested = event
        .guild_id
        .scheduled_event_users(&ctx.http, event.id, None)
        .await
        .unwrap_or_default();
    for event_user in interested {
        if let Err(e) = ctx
            .http
            .add_member_role(
                event.guild_id,
                event_user.user.id,
                role.id,
                Some("User interested in event"),
            )
            .await
        {
            debug!("Cannot add event role to {}: {e}", event_user.user.id);
        }
    }

    Ok(Some(role))
}

/// Delete an event's role and forget the mapping.
pub async fn cleanup_event_role(
    ctx: &serenity::Context,
    data: &Data,
    guild_id: serenity::GuildId,
    event_id: serenity::ScheduledEventId,
    role_id: serenity::RoleId,
) -> Result<(), Error> {
    if let Err(e) = guild_id.delete_role(&ctx.http, role_id).await {
        debug!("Cannot delete event role {role_id} in {guild_id}: {e}");
    }
    data.db
        .delete_event_role(guild_id.get() as i64, event_id.get() as i64)
        .await?;
    Ok(())
}

/// Event-created listener.
pub async fn handle_event_create(
    ctx: &serenity::Context,
    data: &Data,
    event: &serenity::ScheduledEvent,
) -> Result<(), Error> {
    info!("Scheduled event created: {}", event.name);
    create_event_role(ctx, data, event).await?;
    Ok(())
}

/// Event-deleted listener.
pub async fn handle_event_delete(
    ctx: &serenity::Context,
    data: &Data,
    event: &serenity::ScheduledEvent,
) -> Result<(), Error> {
    if let Some(role_id) = data
        .db
        .event_role(event.guild_id.get() as i64, event.id.get() as i64)
        .await?
    {
        cleanup_event_role(
            ctx,
            data,
            event.guild_id,
            event.id,
            serenity::RoleId::new(role_id as u64),
        )
        .await?;
    }
    Ok(())
}

/// Event-updated listener: ended or cancelled events lose their role.
pub async fn handle_event_update(
    ctx: &serenity::Context,
    data: &Data,
    event: &serenity::ScheduledEvent,
) -> Result<(), Error> {
    if is_finished(&event.status) {
        handle_event_delete(ctx, data, event).await?;
    }
    Ok(())
}

/// Interest-added listener.
pub async fn handle_event_user_add(
    ctx: &serenity::Context,
    data: &Data,
    guild_id: serenity::GuildId,
    event_id: serenity::ScheduledEventId,
    user_id: serenity::UserId,
) -> Result<(), Error> {
    if let Some(role_id) = data
        .db
        .event_role(guild_id.get() as i64, event_id.get() as i64)
        .await?
    {
        if let Err(e) = ctx
            .http
            .add_member_role(
                guild_id,
                user_id,
                serenity::RoleId::new(role_id as u64),
                Some("User interested in event"),
            )
            .await
        {
            debug!("Cannot add event role to {user_id}: {e}");
        }
    }
    Ok(())
}

/// Interest-removed listener.
pub async fn handle_event_user_remove(
    ctx: &serenity::Context,
    data: &Data,
    guild_id: serenity::GuildId,
    event_id: serenity::ScheduledEventId,
    user_id: serenity::UserId,
) -> Result<(), Error> {
    if let Some(role_id) = data
        .db
        .event_role(guild_id.get() as i64, event_id.get() as i64)
        .await?
    {
        if let Err(e) = ctx
            .http
            .remove_member_role(
                guild_id,
                user_id,
                serenity::RoleId::new(role_id as u64),
                Some("User no longer interested in event"),
            )
            .await
        {
            debug!("Cannot remove event role from {user_id}: {e}");
        }
    }
    Ok(())
}

/// Minute sweep: reconcile tracked roles with the live event list.
pub async fn sync_event_roles(ctx: &serenity::Context, data: &Data) -> Result<(), Error> {
    let tracked = data.db.all_event_roles().await?;
    let guild_ids: Vec<serenity::GuildId> = ctx.cache.guilds();

    for entry in &tracked {
        let guild_id = serenity::GuildId::new(entry.guild_id as u64);
        if !guild_ids.contains(&guild_id) {
            data.db
                .delete_event_role(entry.guild_id, entry.event_id)
                .await?;
            continue;
        }

        let events = guild_id
            .scheduled_events(&ctx.http, false)
            .await
            .unwrap_or_default();
        let event = events
            .iter()
            .find(|event| event.id.get() as i64 == entry.event_id);
        match event {
            None => {
                cleanup_event_role(
                    ctx,
                    data,
                    guild_id,
                    serenity::ScheduledEventId::new(entry.event_id as u64),
                    serenity::RoleId::new(entry.role_id as u64),
                )
                .await?;
            }
            Some(event) if is_finished(&event.status) => {
                cleanup_event_role(
                    ctx,
                    data,
                    guild_id,
                    event.id,
                    serenity::RoleId::new(entry.role_id as u64),
                )
                .await?;
            }
            Some(event) => {
                // Role vanished out from under us: recreate it
                let roles = ctx.http.get_guild_roles(guild_id).await.unwrap_or_default();
                if !roles
                    .iter()
                    .any(|role| role.id.get() as i64 == entry.role_id)
                {
                    create_event_role(ctx, data, event).await?;
                }
            }
        }
    }

    // Adopt live events nobody is tracking yet
    for guild_id in guild_ids {
        let events = guild_id
            .scheduled_events(&ctx.http, false)
            .await
            .unwrap_or_default();
        for event in events {
            if is_finished(&event.status) {
                continue;
            }
            let known = tracked.iter().any(|entry| {
                entry.guild_id == guild_id.get() as i64 && entry.event_id == event.id.get() as i64
            });
            if !known {
                create_event_role(ctx, data, &event).await?;
            }
        }
    }
    Ok(())
}
