//! Generated daily discussion questions.

use crate::framework::{Data, Error};
use kotori_common::utils::{format_timestamp, utc_now};
use poise::serenity_prelude as serenity;
use serenity::{CreateEmbed, CreateMessage};
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that creates engaging daily questions in Japanese.";

/// Build the generation prompt, steering away from recent topics.
pub fn question_prompt(recent_questions: &[String]) -> String {
    format!(
        "Create a daily question in Japanese that is interesting and original and will \
         spark discussion.\nThe question should be challenging but not too difficult, and \
         should encourage conversation.\nHere are the last questions that were asked \
         (avoid similar topics):\n\n{}\n\nProvide only the question text in Japanese, \
         nothing else.",
        recent_questions.join("\n")
    )
}

/// Post today's question in one channel, unless it already happened.
async fn post_daily_question(
    ctx: &serenity::Context,
    data: &Data,
    guild_id: u64,
    channel_id: u64,
) -> Result<(), Error> {
    let Some(completion) = &data.completion else {
        return Ok(());
    };

    let today = utc_now().date().to_string();
    if data
        .db
        .question_posted_on(guild_id as i64, channel_id as i64, &today)
        .await?
    {
        return Ok(());
    }

    let recent = data
        .db
        .recent_questions(guild_id as i64, channel_id as i64)
        .await?;
    let question = completion
        .complete(SYSTEM_PROMPT, &question_prompt(&recent))
        .await?;

    data.db
        .insert_question(
            guild_id as i64,
            channel_id as i64,
            &question,
            &format_timestamp(utc_now()),
        )
        .await?;

    let embed = CreateEmbed::new()
        .title("今日の質問 / Daily Question")
        .description(question)
        .colour(serenity::Colour::BLUE);
    serenity::ChannelId::new(channel_id)
        .send_message(&ctx.http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

/// Minute sweep: post pending daily questions. Never fatal.
pub async fn check_daily_questions(ctx: &serenity::Context, data: &Data) -> Result<(), Error> {
    if data.completion.is_none() {
        debug!("Daily questions disabled: no completion API key");
        return Ok(());
    }
    for (guild_id, channel_ids) in data.settings.question_channels() {
        for channel_id in channel_ids {
            if let Err(e) = post_daily_question(ctx, data, guild_id, *channel_id).await {
                warn!("Daily question for channel {channel_id} failed: {e}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_prompt_embeds_recent() {
        let recent = vec!["好きな季節は？".to_string(), "朝型？夜型？".to_string()];
        let prompt = question_prompt(&recent);
        assert!(prompt.contains("好きな季節は？"));
        assert!(prompt.contains("朝型？夜型？"));
        assert!(prompt.contains("avoid similar topics"));
    }
}
