//! Owner-gated maintenance commands.

use crate::framework::{Context, Error};
use poise::serenity_prelude as serenity;
use serenity::CreateAttachment;
use tracing::info;

/// Upload the database file to the channel.
#[poise::command(slash_command, owners_only)]
pub async fn post_db(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;

    let url = &ctx.data().settings.database.url;
    let path = url
        .trim_start_matches("sqlite://")
        .split('?')
        .next()
        .unwrap_or_default();
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            ctx.say(format!("An error occurred: {e}")).await?;
            return Ok(());
        }
    };

    info!("Posting database snapshot ({} bytes)", bytes.len());
    ctx.send(
        poise::CreateReply::default()
            .attachment(CreateAttachment::bytes(bytes, "db.sqlite3")),
    )
    .await?;
    Ok(())
}

/// Register or update the application commands.
#[poise::command(prefix_command, owners_only)]
pub async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx).await?;
    Ok(())
}
