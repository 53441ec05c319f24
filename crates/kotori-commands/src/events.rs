//! Gateway event dispatch: routes events to the cogs that care.

use crate::framework::{Data, Error};
use poise::serenity_prelude as serenity;
use tracing::{info, warn};

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            info!("Logged in as {}", data_about_bot.user.name);
        }
        serenity::FullEvent::Message { new_message } => {
            if let Err(e) = crate::gatekeeper::handle_message(ctx, data, new_message).await {
                warn!("Gatekeeper message handler failed: {e}");
            }
            if let Err(e) = crate::sticky::handle_message(ctx, data, new_message).await {
                warn!("Sticky message handler failed: {e}");
            }
        }
        serenity::FullEvent::ReactionAdd { add_reaction } => {
            if let Err(e) = crate::bookmarks::handle_reaction_add(ctx, data, add_reaction).await {
                warn!("Bookmark reaction handler failed: {e}");
            }
            if let Err(e) = crate::kneels::handle_reaction(ctx, data, add_reaction).await {
                warn!("Kneel reaction handler failed: {e}");
            }
        }
        serenity::FullEvent::ReactionRemove { removed_reaction } => {
            if let Err(e) =
                crate::bookmarks::handle_reaction_remove(ctx, data, removed_reaction).await
            {
                warn!("Bookmark reaction handler failed: {e}");
            }
            if let Err(e) = crate::kneels::handle_reaction(ctx, data, removed_reaction).await {
                warn!("Kneel reaction handler failed: {e}");
            }
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            if let Err(e) = crate::rank_saver::restore_ranks(ctx, data, new_member).await {
                warn!("Rank restore failed: {e}");
            }
        }
        serenity::FullEvent::GuildScheduledEventCreate { event } => {
            if let Err(e) = crate::event_roles::handle_event_create(ctx, data, event).await {
                warn!("Event role creation failed: {e}");
            }
        }
        serenity::FullEvent::GuildScheduledEventDelete { event } => {
            if let Err(e) = crate::event_roles::handle_event_delete(ctx, data, event).await {
                warn!("Event role cleanup failed: {e}");
            }
        }
        serenity::FullEvent::GuildScheduledEventUpdate { event } => {
            if let Err(e) = crate::event_roles::handle_event_update(ctx, data, event).await {
                warn!("Event role update failed: {e}");
            }
        }
        serenity::FullEvent::GuildScheduledEventUserAdd { subscribed } => {
            if let Err(e) = crate::event_roles::handle_event_user_add(
                ctx,
                data,
                subscribed.guild_id,
                subscribed.scheduled_event_id,
                subscribed.user_id,
            )
            .await
            {
                warn!("Event role grant failed: {e}");
            }
        }
        serenity::FullEvent::GuildScheduledEventUserRemove { unsubscribed } => {
            if let Err(e) = crate::event_roles::handle_event_user_remove(
                ctx,
                data,
                unsubscribed.guild_id,
                unsubscribed.scheduled_event_id,
                unsubscribed.user_id,
            )
            .await
            {
                warn!("Event role removal failed: {e}");
            }
        }
        _ => {}
    }
    Ok(())
}
