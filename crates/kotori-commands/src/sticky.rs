//! Sticky messages: keep one message pinned to the bottom of a channel.

use crate::framework::{Context, Data, Error};
use poise::serenity_prelude as serenity;
use serenity::{CreateMessage, GetMessages};
use tracing::debug;

const STICKY_PREFIX: &str = "📌 **Sticky Message:**";

/// Repost `original` at the bottom of the channel.
async fn post_sticky(
    ctx: &serenity::Context,
    channel_id: serenity::ChannelId,
    original: &serenity::Message,
) -> Result<serenity::Message, Error> {
    let mut create =
        CreateMessage::new().content(format!("{STICKY_PREFIX}\n\n{}", original.content));
    if let Some(embed) = original.embeds.first() {
        create = create.embed(embed.clone().into());
    }
    for attachment in &original.attachments {
        if let Ok(bytes) = attachment.download().await {
            create = create.add_file(serenity::CreateAttachment::bytes(
                bytes,
                attachment.filename.clone(),
            ));
        }
    }
    Ok(channel_id.send_message(&ctx.http, create).await?)
}

/// Make the last message sticky in this channel.
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MANAGE_MESSAGES"
)]
pub async fn sticky_last_message(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let recent = ctx
        .channel_id()
        .messages(ctx.http(), GetMessages::new().limit(5))
        .await?;
    let Some(last_message) = recent
        .iter()
        .find(|message| message.interaction.is_none() && !message.author.bot)
    else {
        ctx.say("No recent message found to sticky.").await?;
        return Ok(());
    };

    let sticky = post_sticky(ctx.serenity_context(), ctx.channel_id(), last_message).await?;
    ctx.data()
        .db
        .upsert_sticky_message(
            guild_id.get() as i64,
            ctx.channel_id().get() as i64,
            last_message.id.get() as i64,
            Some(sticky.id.get() as i64),
        )
        .await?;

    ctx.say("Message has been made sticky!").await?;
    Ok(())
}

/// Remove the sticky message from this channel.
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MANAGE_MESSAGES"
)]
pub async fn unsticky(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();

    let Some(sticky) = data
        .db
        .sticky_message(guild_id.get() as i64, ctx.channel_id().get() as i64)
        .await?
    else {
        ctx.say("No sticky message found in this channel!").await?;
        return Ok(());
    };

    if let Some(stickied_id) = sticky.stickied_message_id {
        if let Err(e) = ctx
            .channel_id()
            .delete_message(ctx.http(), serenity::MessageId::new(stickied_id as u64))
            .await
        {
            debug!("Sticky repost already gone: {e}");
        }
    }
    data.db
        .delete_sticky_message(guild_id.get() as i64, ctx.channel_id().get() as i64)
        .await?;

    ctx.say("Sticky message has been removed!").await?;
    Ok(())
}

/// Message listener: bump the sticky back to the bottom.
pub async fn handle_message(
    ctx: &serenity::Context,
    data: &Data,
    message: &serenity::Message,
) -> Result<(), Error> {
    if message.author.bot {
        return Ok(());
    }
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };

    let Some(sticky) = data
        .db
        .sticky_message(guild_id.get() as i64, message.channel_id.get() as i64)
        .await?
    else {
        return Ok(());
    };

    if let Some(old_id) = sticky.stickied_message_id {
        if let Err(e) = message
            .channel_id
            .delete_message(&ctx.http, serenity::MessageId::new(old_id as u64))
            .await
        {
            debug!("Old sticky repost already gone: {e}");
        }
    }

    let original = message
        .channel_id
        .message(
            ctx,
            serenity::MessageId::new(sticky.original_message_id as u64),
        )
        .await;
    match original {
        Ok(original) => {
            let new_sticky = post_sticky(ctx, message.channel_id, &original).await?;
            data.db
                .upsert_sticky_message(
                    guild_id.get() as i64,
                    message.channel_id.get() as i64,
                    sticky.original_message_id,
                    Some(new_sticky.id.get() as i64),
                )
                .await?;
        }
        // Original was deleted: the sticky dies with it
        Err(_) => {
            data.db
                .delete_sticky_message(guild_id.get() as i64, message.channel_id.get() as i64)
                .await?;
        }
    }
    Ok(())
}
