//! Reaction-driven DM bookmarks and the bookmark leaderboard.

use crate::framework::{Context, Data, Error};
use crate::usernames::get_username;
use poise::serenity_prelude as serenity;
use serenity::{CreateEmbed, CreateEmbedAuthor, CreateMessage, ReactionType};
use std::time::Duration;
use tracing::debug;

pub const BOOKMARK_EMOJI: &str = "🔖";
pub const REMOVE_EMOJI: &str = "❌";

async fn fetch_message(
    ctx: &serenity::Context,
    channel_id: serenity::ChannelId,
    message_id: serenity::MessageId,
) -> Result<serenity::Message, serenity::Error> {
    channel_id.message(ctx, message_id).await
}

/// DM the bookmarked message to the user; returns the DM message.
async fn send_bookmark_dm(
    ctx: &serenity::Context,
    user: &serenity::User,
    message: &serenity::Message,
) -> Result<serenity::Message, Error> {
    let guild_name = match message.guild_id {
        Some(guild_id) => guild_id
            .to_partial_guild(&ctx.http)
            .await
            .map(|guild| guild.name)
            .unwrap_or_else(|_| "a server".to_string()),
        None => "a server".to_string(),
    };

    let mut embed = CreateEmbed::new()
        .title(format!("**Bookmark from {guild_name}**"))
        .description(message.content.clone())
        .timestamp(message.timestamp)
        .colour(serenity::Colour::BLUE)
        .author(
            CreateEmbedAuthor::new(message.author.display_name())
                .icon_url(message.author.face()),
        );

    let mut files = Vec::new();
    if let Some(image) = message.attachments.iter().find(|attachment| {
        attachment
            .content_type
            .as_deref()
            .is_some_and(|kind| kind.starts_with("image/"))
    }) {
        embed = embed.image(image.url.clone());
    }
    for (index, attachment) in message.attachments.iter().enumerate() {
        if attachment
            .content_type
            .as_deref()
            .is_some_and(|kind| kind.starts_with("video/"))
        {
            if let Ok(bytes) = attachment.download().await {
                files.push(serenity::CreateAttachment::bytes(
                    bytes,
                    attachment.filename.clone(),
                ));
            }
        }
        embed = embed.field(
            format!("Attachment {}", index + 1),
            format!("[{}]({})", attachment.filename, attachment.url),
            false,
        );
    }
    embed = embed.field(
        "Source",
        format!("[[Jump to message]]({})", message.link()),
        false,
    );

    let dm_channel = user.create_dm_channel(&ctx.http).await?;
    let mut create = CreateMessage::new().embed(embed);
    for file in files {
        create = create.add_file(file);
    }
    let dm_message = dm_channel.send_message(&ctx.http, create).await?;

    if dm_message.pin(&ctx.http).await.is_err() {
        dm_channel
            .send_message(
                &ctx.http,
                CreateMessage::new()
                    .content("Reached 50 pinned messages limit. Unpin messages to pin more."),
            )
            .await?;
    }
    dm_message
        .react(&ctx.http, ReactionType::Unicode(REMOVE_EMOJI.to_string()))
        .await?;
    Ok(dm_message)
}

/// Recount 🔖 reactions on a message and store the total.
async fn refresh_bookmark_count(
    ctx: &serenity::Context,
    data: &Data,
    channel_id: serenity::ChannelId,
    message_id: serenity::MessageId,
) -> Result<(), Error> {
    let message = {
        let _guard = data.fetch_lock.lock().await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        fetch_message(ctx, channel_id, message_id).await?
    };
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };

    let count = message
        .reactions
        .iter()
        .find(|reaction| reaction.reaction_type.unicode_eq(BOOKMARK_EMOJI))
        .map(|reaction| reaction.count as i64)
        .unwrap_or(0);

    data.db
        .update_bookmark_count(
            guild_id.get() as i64,
            message.channel_id.get() as i64,
            message.id.get() as i64,
            message.author.id.get() as i64,
            &message.link(),
            count,
        )
        .await?;
    Ok(())
}

/// Reaction-added listener.
pub async fn handle_reaction_add(
    ctx: &serenity::Context,
    data: &Data,
    reaction: &serenity::Reaction,
) -> Result<(), Error> {
    let own_id = ctx.cache.current_user().id;
    let Some(user_id) = reaction.user_id else {
        return Ok(());
    };
    if user_id == own_id {
        return Ok(());
    }

    // ❌ in the bot's DM deletes the bookmark
    if reaction.guild_id.is_none() {
        if reaction.emoji.unicode_eq(REMOVE_EMOJI) {
            data.db
                .delete_user_bookmark(user_id.get() as i64, reaction.message_id.get() as i64)
                .await?;
            match fetch_message(ctx, reaction.channel_id, reaction.message_id).await {
                Ok(message) => message.delete(&ctx.http).await?,
                Err(e) => debug!("Bookmark DM already gone: {e}"),
            }
        }
        return Ok(());
    }

    if !reaction.emoji.unicode_eq(BOOKMARK_EMOJI) {
        return Ok(());
    }
    let Some(guild_id) = reaction.guild_id else {
        return Ok(());
    };

    if data
        .db
        .bookmark_exists(user_id.get() as i64, reaction.message_id.get() as i64)
        .await?
    {
        refresh_bookmark_count(ctx, data, reaction.channel_id, reaction.message_id).await?;
        return Ok(());
    }

    let (message, user) = {
        let _guard = data.fetch_lock.lock().await;
        let message = fetch_message(ctx, reaction.channel_id, reaction.message_id).await?;
        let user = ctx.http.get_user(user_id).await?;
        (message, user)
    };

    let dm_message = match send_bookmark_dm(ctx, &user, &message).await {
        Ok(dm_message) => dm_message,
        // DMs closed
        Err(e) => {
            debug!("Could not DM bookmark to {user_id}: {e}");
            return Ok(());
        }
    };

    data.db
        .insert_user_bookmark(
            guild_id.get() as i64,
            reaction.channel_id.get() as i64,
            user_id.get() as i64,
            reaction.message_id.get() as i64,
            &message.link(),
            dm_message.id.get() as i64,
        )
        .await?;
    refresh_bookmark_count(ctx, data, reaction.channel_id, reaction.message_id).await?;
    Ok(())
}

/// Reaction-removed listener.
pub async fn handle_reaction_remove(
    ctx: &serenity::Context,
    data: &Data,
    reaction: &serenity::Reaction,
) -> Result<(), Error> {
    if reaction.guild_id.is_some() && reaction.emoji.unicode_eq(BOOKMARK_EMOJI) {
        refresh_bookmark_count(ctx, data, reaction.channel_id, reaction.message_id).await?;
    }
    Ok(())
}

/// Shows most bookmarked messages.
#[poise::command(slash_command, guild_only)]
pub async fn bookmarkboard(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let top = ctx.data().db.top_bookmarks(guild_id.get() as i64).await?;
    if top.is_empty() {
        ctx.say("No bookmarked messages found.").await?;
        return Ok(());
    }

    let mut embed = CreateEmbed::new()
        .title("Most Bookmarked Messages")
        .colour(serenity::Colour::BLUE);
    for (index, entry) in top.iter().enumerate() {
        let author = get_username(
            ctx.serenity_context(),
            ctx.data(),
            serenity::UserId::new(entry.message_author_id as u64),
        )
        .await;
        embed = embed.field(
            format!(
                "{}. By {author} ({} bookmarks)",
                index + 1,
                entry.bookmark_count
            ),
            format!("[Jump to message]({})", entry.message_link),
            false,
        );
    }
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Check and remove deleted messages from the bookmark leaderboard.
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn checkbookmarks(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let top = ctx.data().db.top_bookmarks(guild_id.get() as i64).await?;
    if top.is_empty() {
        ctx.say("No bookmarked messages found.").await?;
        return Ok(());
    }

    let mut removed = 0;
    for entry in &top {
        let channel_id = serenity::ChannelId::new(entry.channel_id as u64);
        let message_id = serenity::MessageId::new(entry.message_id as u64);
        if fetch_message(ctx.serenity_context(), channel_id, message_id)
            .await
            .is_err()
        {
            ctx.data()
                .db
                .delete_bookmarked_message(guild_id.get() as i64, entry.message_id)
                .await?;
            removed += 1;
        }
    }

    ctx.say(format!(
        "Cleanup complete. Removed {removed} deleted messages from bookmarks."
    ))
    .await?;
    Ok(())
}
