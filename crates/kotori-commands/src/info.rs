//! Config-driven info topics.

use crate::framework::{AppContext, Context, Error};
use poise::serenity_prelude as serenity;
use poise::serenity_prelude::AutocompleteChoice;
use serenity::CreateEmbed;

const MAX_TOPIC_CHOICES: usize = 25;

/// Autocomplete over the configured topic keys.
pub async fn topic_autocomplete(ctx: AppContext<'_>, partial: &str) -> Vec<AutocompleteChoice> {
    let input = partial.trim().to_lowercase();
    ctx.data
        .settings
        .info_topics
        .keys()
        .filter(|key| input.is_empty() || key.to_lowercase().contains(&input))
        .take(MAX_TOPIC_CHOICES)
        .map(|key| AutocompleteChoice::new(key.clone(), key.clone()))
        .collect()
}

async fn send_topic(ctx: Context<'_>, label: &str, key: &str) -> Result<(), Error> {
    let Some(text) = ctx.data().settings.info_topics.get(key) else {
        ctx.send(
            poise::CreateReply::default()
                .content(format!("{label} key not found."))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };

    let embed = CreateEmbed::new()
        .title(format!("{label} for `{key}`"))
        .description(text)
        .colour(serenity::Colour::from_rgb(
            rand::random(),
            rand::random(),
            rand::random(),
        ));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Get various pieces of valuable knowledge!
#[poise::command(slash_command)]
pub async fn info(
    ctx: Context<'_>,
    #[description = "The topic."]
    #[autocomplete = "topic_autocomplete"]
    info_key: String,
) -> Result<(), Error> {
    send_topic(ctx, "Info", &info_key).await
}

/// Get various pieces of valuable knowledge!
#[poise::command(slash_command)]
pub async fn help(
    ctx: Context<'_>,
    #[description = "The topic."]
    #[autocomplete = "topic_autocomplete"]
    help_key: String,
) -> Result<(), Error> {
    send_topic(ctx, "Help", &help_key).await
}
