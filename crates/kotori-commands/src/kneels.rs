//! Kneel reactions and their leaderboard.

use crate::framework::{Context, Data, Error};
use poise::serenity_prelude as serenity;
use serenity::CreateEmbed;
use std::time::Duration;

/// Whether an emoji counts as a kneel.
pub fn is_kneel_emoji(emoji: &serenity::ReactionType) -> bool {
    match emoji {
        serenity::ReactionType::Unicode(s) => s == "🧎" || s == "🧎‍♂️" || s == "🧎‍♀️",
        serenity::ReactionType::Custom { name, .. } => name
            .as_deref()
            .is_some_and(|name| name.contains("ikneel")),
        _ => false,
    }
}

/// Recount kneel reactions on a message and store the score.
async fn refresh_kneel_score(
    ctx: &serenity::Context,
    data: &Data,
    reaction: &serenity::Reaction,
) -> Result<(), Error> {
    let message = {
        let _guard = data.fetch_lock.lock().await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        reaction.channel_id.message(ctx, reaction.message_id).await?
    };
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };
    // Kneeling to yourself does not count
    if reaction.user_id == Some(message.author.id) {
        return Ok(());
    }

    let score: i64 = message
        .reactions
        .iter()
        .filter(|r| is_kneel_emoji(&r.reaction_type))
        .map(|r| r.count as i64)
        .sum();

    data.db
        .upsert_kneel_score(
            guild_id.get() as i64,
            message.id.get() as i64,
            message.author.id.get() as i64,
            score,
            message.author.display_name(),
        )
        .await?;
    Ok(())
}

/// Reaction listener shared by add and remove events.
pub async fn handle_reaction(
    ctx: &serenity::Context,
    data: &Data,
    reaction: &serenity::Reaction,
) -> Result<(), Error> {
    if !is_kneel_emoji(&reaction.emoji) {
        return Ok(());
    }
    refresh_kneel_score(ctx, data, reaction).await
}

/// ikneel
#[poise::command(slash_command)]
pub async fn kneelderboard(
    ctx: Context<'_>,
    #[description = "Guild id to show the leaderboard for (optional)."] guild_id: Option<String>,
) -> Result<(), Error> {
    ctx.defer().await?;

    let guild_id = match guild_id.and_then(|raw| raw.parse::<u64>().ok()) {
        Some(id) => id,
        None => match ctx.guild_id() {
            Some(id) => id.get(),
            None => {
                ctx.say("This command only works in a server.").await?;
                return Ok(());
            }
        },
    };

    let data = ctx.data();
    let top = data.db.top_kneels(guild_id as i64).await?;
    if top.is_empty() {
        ctx.say("No kneels found.").await?;
        return Ok(());
    }

    let mut embed = CreateEmbed::new()
        .title("Kneel Leaderboard")
        .colour(serenity::Colour::BLURPLE);
    for (index, entry) in top.iter().enumerate() {
        let name = crate::usernames::get_username(
            ctx.serenity_context(),
            data,
            serenity::UserId::new(entry.user_id as u64),
        )
        .await;
        // Refresh stale stored names as we go
        if Some(name.as_str()) != entry.user_name.as_deref() {
            let _ = data.db.update_kneel_username(entry.user_id, &name).await;
        }
        embed = embed.field(
            format!("**{}. {name}**", index + 1),
            entry.total_score.to_string(),
            true,
        );
    }

    let own = data
        .db
        .user_kneels(guild_id as i64, ctx.author().id.get() as i64)
        .await?;
    embed = embed.field("Your Kneels", own.to_string(), true);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unicode_kneels() {
        assert!(is_kneel_emoji(&serenity::ReactionType::Unicode("🧎".into())));
        assert!(is_kneel_emoji(&serenity::ReactionType::Unicode("🧎‍♀️".into())));
        assert!(!is_kneel_emoji(&serenity::ReactionType::Unicode("🔖".into())));
    }

    #[test]
    fn test_custom_kneels() {
        let custom = serenity::ReactionType::Custom {
            animated: false,
            id: serenity::EmojiId::new(1),
            name: Some("ikneel_hard".to_string()),
        };
        assert!(is_kneel_emoji(&custom));

        let other = serenity::ReactionType::Custom {
            animated: false,
            id: serenity::EmojiId::new(2),
            name: Some("pog".to_string()),
        };
        assert!(!is_kneel_emoji(&other));
    }
}
