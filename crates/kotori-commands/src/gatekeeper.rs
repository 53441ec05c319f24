//! Quiz gating: verifies quiz reports and hands out rank roles.

use crate::framework::{Data, Error};
use kotori_common::utils::{format_timestamp, utc_now};
use kotori_config::settings::{GuildGatekeeper, QuizRank};
use kotori_media::quiz_report::{extract_report_id, GameReport};
use poise::serenity_prelude as serenity;
use serenity::{Mentionable, Timestamp};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Why a quiz result was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyFailure {
    MultipleParticipants,
    ShuffleDisabled,
    Loaded,
    MultipleChoice,
    WrongStartIndex,
    WrongEndIndex,
    MissingIndex,
    UnexpectedIndex,
    WrongForeground,
    WrongEffect,
    WrongScoreLimit,
    WrongTimeLimit,
    WrongFont,
    WrongFontSize,
    TooManyMisses,
    NotEnoughAnswered,
}

impl VerifyFailure {
    pub fn message(&self) -> &'static str {
        match self {
            Self::MultipleParticipants => "Quiz failed due to multiple people participating.",
            Self::ShuffleDisabled => "Quiz failed due to shuffle being turned off.",
            Self::Loaded => "Quiz failed due to being loaded from a saved session.",
            Self::MultipleChoice => "Quiz failed due to being set to multiple choice.",
            Self::WrongStartIndex => "Quiz failed due to having the wrong start index.",
            Self::WrongEndIndex => "Quiz failed due to having the wrong end index.",
            Self::MissingIndex => "Quiz failed due to not having an index specified.",
            Self::UnexpectedIndex => "Quiz failed due to having a custom index.",
            Self::WrongForeground => "Foreground color does not match required color.",
            Self::WrongEffect => "Effect does not match required effect.",
            Self::WrongScoreLimit => "Set score limit and required score limit don't match.",
            Self::WrongTimeLimit => "Set answer time does not match required answer time.",
            Self::WrongFont => "Set font does not match required font.",
            Self::WrongFontSize => "Set font size does not match required font size.",
            Self::TooManyMisses => "Failed too many questions.",
            Self::NotEnoughAnswered => "Not enough questions answered.",
        }
    }
}

/// Check a quiz report against the configured requirements.
///
/// A flat sequence of field comparisons; the first mismatch wins.
pub fn verify_quiz_result(rank: &QuizRank, report: &GameReport) -> Result<(), VerifyFailure> {
    if report.participants.len() > 1 {
        return Err(VerifyFailure::MultipleParticipants);
    }
    if !report.settings.shuffle {
        return Err(VerifyFailure::ShuffleDisabled);
    }
    if report.is_loaded {
        return Err(VerifyFailure::Loaded);
    }
    for deck in &report.decks {
        if deck.mc {
            return Err(VerifyFailure::MultipleChoice);
        }
    }

    match rank.deck_range {
        Some((start, end)) => {
            for deck in &report.decks {
                match (deck.start_index, deck.end_index) {
                    (Some(deck_start), Some(deck_end)) => {
                        if deck_start != start {
                            return Err(VerifyFailure::WrongStartIndex);
                        }
                        if deck_end != end {
                            return Err(VerifyFailure::WrongEndIndex);
                        }
                    }
                    _ => return Err(VerifyFailure::MissingIndex),
                }
            }
        }
        None => {
            for deck in &report.decks {
                if deck.start_index.is_some() || deck.end_index.is_some() {
                    return Err(VerifyFailure::UnexpectedIndex);
                }
            }
        }
    }

    if let Some(foreground) = &rank.foreground {
        if report.settings.font_color.as_deref() != Some(foreground.as_str()) {
            return Err(VerifyFailure::WrongForeground);
        }
    }
    if let Some(effect) = &rank.effect {
        if report.settings.effect.as_deref() != Some(effect.as_str()) {
            return Err(VerifyFailure::WrongEffect);
        }
    }
    if rank.score_limit != report.settings.score_limit {
        return Err(VerifyFailure::WrongScoreLimit);
    }
    if rank.answer_time_limit_ms != report.settings.answer_time_limit_in_ms {
        return Err(VerifyFailure::WrongTimeLimit);
    }
    if let Some(font) = &rank.font {
        if report.settings.font.as_deref() != Some(font.as_str()) {
            return Err(VerifyFailure::WrongFont);
        }
    }
    if let Some(font_size) = rank.font_size {
        if report.settings.font_size != Some(font_size) {
            return Err(VerifyFailure::WrongFontSize);
        }
    }

    let score = report.scores.first().map(|s| s.score).unwrap_or(0);
    let missed = report.questions.len() as i64 - score;
    if missed > rank.max_missed {
        return Err(VerifyFailure::TooManyMisses);
    }
    if score != rank.score_limit {
        return Err(VerifyFailure::NotEnoughAnswered);
    }

    Ok(())
}

/// Find the configured rank whose deck set matches the report's decks.
pub fn matching_rank<'a>(gk: &'a GuildGatekeeper, report: &GameReport) -> Option<&'a QuizRank> {
    let deck_names: HashSet<&str> = report.deck_names().into_iter().collect();
    gk.ranks.iter().find(|rank| {
        !rank.combination_rank
            && rank.decks.iter().map(String::as_str).collect::<HashSet<_>>() == deck_names
    })
}

/// Restricted quiz name mentioned in a message, when any.
pub fn restricted_quiz<'a>(gk: &'a GuildGatekeeper, content: &str) -> Option<&'a str> {
    let lowered = content.to_lowercase();
    gk.restricted_quiz_names
        .iter()
        .find(|name| lowered.contains(&name.to_lowercase()))
        .map(String::as_str)
}

/// Whether a message is exactly one of the configured quiz commands.
pub fn is_exact_quiz_command(gk: &GuildGatekeeper, content: &str) -> bool {
    gk.ranks
        .iter()
        .any(|rank| !rank.combination_rank && rank.command == content)
}

async fn timeout_member(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    minutes: i64,
    reason: &str,
) {
    let until = utc_now().and_utc().timestamp() + minutes * 60;
    let Ok(timestamp) = Timestamp::from_unix_timestamp(until) else {
        return;
    };
    let edit = serenity::EditMember::new()
        .disable_communication_until_datetime(timestamp)
        .audit_log_reason(reason);
    if let Err(e) = guild_id.edit_member(&ctx.http, user_id, edit).await {
        debug!("Could not time out {user_id}: {e}");
    }
}

/// Validate a user's quiz invocation, timing out rule breakers.
///
/// Returns `false` when the message was rejected.
async fn check_command_input(
    ctx: &serenity::Context,
    gk: &GuildGatekeeper,
    message: &serenity::Message,
) -> Result<bool, Error> {
    let in_levelup_channel = gk.levelup_channels.contains(&message.channel_id.get());
    let restricted = restricted_quiz(gk, &message.content);
    let exact_command = is_exact_quiz_command(gk, &message.content);

    if in_levelup_channel && !exact_command {
        message
            .channel_id
            .say(
                &ctx.http,
                format!(
                    "{} Please use the exact quiz command in the level-up channel.",
                    message.author.mention()
                ),
            )
            .await?;
        if let Some(guild_id) = message.guild_id {
            timeout_member(ctx, guild_id, message.author.id, 2, "Invalid quiz attempt").await;
        }
        return Ok(false);
    }

    if let Some(quiz_name) = restricted {
        if !in_levelup_channel || !exact_command {
            message
                .channel_id
                .say(
                    &ctx.http,
                    format!(
                        "{} {quiz_name} quiz is restricted.\nYou can only use it in the \
                         level-up channel with the exact commands.",
                        message.author.mention()
                    ),
                )
                .await?;
            if let Some(guild_id) = message.guild_id {
                timeout_member(ctx, guild_id, message.author.id, 2, "Restricted quiz attempt")
                    .await;
            }
            return Ok(false);
        }
    }

    if exact_command && !in_levelup_channel {
        message
            .channel_id
            .say(
                &ctx.http,
                format!(
                    "{} Please use this quiz command in the level-up channels.",
                    message.author.mention()
                ),
            )
            .await?;
        if let Some(guild_id) = message.guild_id {
            timeout_member(ctx, guild_id, message.author.id, 2, "Invalid channel for quiz attempt")
                .await;
        }
        return Ok(false);
    }

    Ok(true)
}

/// Report id from a finished-quiz embed, when the message carries one.
pub fn report_id_from_message(message: &serenity::Message) -> Option<String> {
    let embed = message.embeds.first()?;
    if !embed.title.as_deref()?.contains("Ended") {
        return None;
    }
    let last_field = embed.fields.last()?;
    extract_report_id(&last_field.value).map(str::to_string)
}

/// Every configured rank role of a guild.
fn all_rank_roles(gk: &GuildGatekeeper) -> Vec<serenity::RoleId> {
    gk.ranks
        .iter()
        .filter_map(|rank| rank.role_to_get)
        .map(serenity::RoleId::new)
        .collect()
}

async fn swap_rank_roles(
    ctx: &serenity::Context,
    gk: &GuildGatekeeper,
    member: &serenity::Member,
    role_to_get: serenity::RoleId,
) -> Result<(), Error> {
    let rank_roles = all_rank_roles(gk);
    let held: Vec<serenity::RoleId> = member
        .roles
        .iter()
        .filter(|role| rank_roles.contains(role))
        .copied()
        .collect();
    if !held.is_empty() {
        member.remove_roles(&ctx.http, &held).await?;
    }
    member.add_role(&ctx.http, role_to_get).await?;
    Ok(())
}

/// Grant whatever a passed quiz earns: a rank role, or progress towards a
/// combination rank.
async fn reward_member(
    ctx: &serenity::Context,
    data: &Data,
    gk: &GuildGatekeeper,
    member: &serenity::Member,
    rank: &QuizRank,
) -> Result<(), Error> {
    data.db
        .add_passed_quiz(
            gk.guild_id as i64,
            member.user.id.get() as i64,
            &rank.name,
        )
        .await?;

    if let Some(role_id) = rank.role_to_get {
        swap_rank_roles(ctx, gk, member, serenity::RoleId::new(role_id)).await?;
    } else {
        check_combination_ranks(ctx, data, gk, member).await?;
    }
    Ok(())
}

/// Promote to the highest combination rank whose required quizzes are all
/// passed, when the member does not already hold it.
async fn check_combination_ranks(
    ctx: &serenity::Context,
    data: &Data,
    gk: &GuildGatekeeper,
    member: &serenity::Member,
) -> Result<(), Error> {
    let passed = data
        .db
        .passed_quizzes(gk.guild_id as i64, member.user.id.get() as i64)
        .await?;

    // Highest rank first
    for rank in gk.ranks.iter().rev().filter(|rank| rank.combination_rank) {
        let Some(role_id) = rank.role_to_get else {
            continue;
        };
        let role_id = serenity::RoleId::new(role_id);
        if member.roles.contains(&role_id) {
            return Ok(());
        }
        if rank
            .quizzes_required
            .iter()
            .all(|name| passed.contains(name))
        {
            swap_rank_roles(ctx, gk, member, role_id).await?;
            let role_name = ctx
                .http
                .get_guild_roles(serenity::GuildId::new(gk.guild_id))
                .await?
                .into_iter()
                .find(|role| role.id == role_id)
                .map(|role| role.name)
                .unwrap_or_else(|| rank.name.clone());
            serenity::ChannelId::new(gk.announce_channel)
                .say(
                    &ctx.http,
                    format!("{} is now a {role_name}!", member.user.mention()),
                )
                .await?;
            return Ok(());
        }
    }
    Ok(())
}

/// Message listener: watches quiz invocations and quiz-bot report embeds.
pub async fn handle_message(
    ctx: &serenity::Context,
    data: &Data,
    message: &serenity::Message,
) -> Result<(), Error> {
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };
    let Some(gk) = data.settings.gatekeeper_for(guild_id.get()) else {
        return Ok(());
    };

    let from_quiz_bot = message.author.id.get() == data.settings.gatekeeper.quiz_bot_id;
    let quiz_prefix = data.settings.gatekeeper.quiz_prefix.to_lowercase();
    if !from_quiz_bot && !message.content.to_lowercase().contains(&quiz_prefix) {
        return Ok(());
    }

    if !from_quiz_bot {
        check_command_input(ctx, gk, message).await?;
        return Ok(());
    }

    let Some(report_id) = report_id_from_message(message) else {
        return Ok(());
    };
    let report = data.quiz_reports.fetch_report(&report_id).await?;
    let Some(rank) = matching_rank(gk, &report) else {
        debug!("No configured rank matches decks {:?}", report.deck_names());
        return Ok(());
    };
    let Some(user_id) = report.participant_id() else {
        warn!("Quiz report {report_id} has no parseable participant");
        return Ok(());
    };

    let member = guild_id
        .member(&ctx.http, serenity::UserId::new(user_id))
        .await?;
    let passed = data
        .db
        .passed_quizzes(guild_id.get() as i64, user_id as i64)
        .await?;
    if passed.contains(&rank.name) {
        return Ok(());
    }

    let verdict = verify_quiz_result(rank, &report);
    data.db
        .add_quiz_attempt(
            guild_id.get() as i64,
            user_id as i64,
            &rank.name,
            &format_timestamp(utc_now()),
            verdict.is_ok(),
        )
        .await?;

    match verdict {
        Ok(()) => {
            info!("{user_id} passed the {} quiz", rank.name);
            serenity::ChannelId::new(gk.announce_channel)
                .say(
                    &ctx.http,
                    format!(
                        "{} has passed the {} quiz!",
                        member.user.mention(),
                        rank.name
                    ),
                )
                .await?;
            reward_member(ctx, data, gk, &member, rank).await?;
        }
        Err(failure) => {
            message.channel_id.say(&ctx.http, failure.message()).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kotori_media::quiz_report::{
        Participant, ReportDeck, ReportScore, ReportSettings, ReportUser,
    };

    fn base_rank() -> QuizRank {
        QuizRank {
            name: "N5".to_string(),
            command: "k!q n5".to_string(),
            decks: vec!["n5".to_string()],
            role_to_get: Some(1),
            combination_rank: false,
            quizzes_required: Vec::new(),
            score_limit: 10,
            answer_time_limit_ms: 16_000,
            font: None,
            font_size: None,
            max_missed: 2,
            foreground: None,
            effect: None,
            deck_range: None,
        }
    }

    fn base_report() -> GameReport {
        GameReport {
            participants: vec![Participant {
                discord_user: ReportUser {
                    id: "123".to_string(),
                },
            }],
            decks: vec![ReportDeck {
                mc: false,
                short_name: "n5".to_string(),
                start_index: None,
                end_index: None,
            }],
            settings: ReportSettings {
                shuffle: true,
                font_color: None,
                effect: None,
                score_limit: 10,
                answer_time_limit_in_ms: 16_000,
                font: None,
                font_size: None,
            },
            is_loaded: false,
            questions: vec![serde_json::Value::Null; 11],
            scores: vec![ReportScore { score: 10 }],
        }
    }

    #[test]
    fn test_valid_result_passes() {
        assert_eq!(verify_quiz_result(&base_rank(), &base_report()), Ok(()));
    }

    #[test]
    fn test_multiple_participants_fail() {
        let mut report = base_report();
        report.participants.push(report.participants[0].clone());
        assert_eq!(
            verify_quiz_result(&base_rank(), &report),
            Err(VerifyFailure::MultipleParticipants)
        );
    }

    #[test]
    fn test_shuffle_and_loaded_checks() {
        let mut report = base_report();
        report.settings.shuffle = false;
        assert_eq!(
            verify_quiz_result(&base_rank(), &report),
            Err(VerifyFailure::ShuffleDisabled)
        );

        let mut report = base_report();
        report.is_loaded = true;
        assert_eq!(
            verify_quiz_result(&base_rank(), &report),
            Err(VerifyFailure::Loaded)
        );
    }

    #[test]
    fn test_multiple_choice_deck_fails() {
        let mut report = base_report();
        report.decks[0].mc = true;
        assert_eq!(
            verify_quiz_result(&base_rank(), &report),
            Err(VerifyFailure::MultipleChoice)
        );
    }

    #[test]
    fn test_unexpected_index_fails() {
        let mut report = base_report();
        report.decks[0].start_index = Some(5);
        assert_eq!(
            verify_quiz_result(&base_rank(), &report),
            Err(VerifyFailure::UnexpectedIndex)
        );
    }

    #[test]
    fn test_pinned_deck_range() {
        let mut rank = base_rank();
        rank.deck_range = Some((1, 100));

        let mut report = base_report();
        report.decks[0].start_index = Some(1);
        report.decks[0].end_index = Some(100);
        assert_eq!(verify_quiz_result(&rank, &report), Ok(()));

        report.decks[0].end_index = Some(50);
        assert_eq!(
            verify_quiz_result(&rank, &report),
            Err(VerifyFailure::WrongEndIndex)
        );

        report.decks[0].start_index = None;
        assert_eq!(
            verify_quiz_result(&rank, &report),
            Err(VerifyFailure::MissingIndex)
        );
    }

    #[test]
    fn test_settings_mismatches() {
        let mut report = base_report();
        report.settings.score_limit = 5;
        assert_eq!(
            verify_quiz_result(&base_rank(), &report),
            Err(VerifyFailure::WrongScoreLimit)
        );

        let mut report = base_report();
        report.settings.answer_time_limit_in_ms = 30_000;
        assert_eq!(
            verify_quiz_result(&base_rank(), &report),
            Err(VerifyFailure::WrongTimeLimit)
        );

        let mut rank = base_rank();
        rank.font = Some("mincho".to_string());
        assert_eq!(
            verify_quiz_result(&rank, &base_report()),
            Err(VerifyFailure::WrongFont)
        );

        let mut rank = base_rank();
        rank.foreground = Some("rgb(0, 0, 0)".to_string());
        assert_eq!(
            verify_quiz_result(&rank, &base_report()),
            Err(VerifyFailure::WrongForeground)
        );
    }

    #[test]
    fn test_score_checks() {
        // 11 questions, score 7: four misses exceed the cap of two
        let mut report = base_report();
        report.scores[0].score = 7;
        assert_eq!(
            verify_quiz_result(&base_rank(), &report),
            Err(VerifyFailure::TooManyMisses)
        );

        // 11 questions, score 9: two misses are fine, but the limit was not hit
        let mut report = base_report();
        report.scores[0].score = 9;
        assert_eq!(
            verify_quiz_result(&base_rank(), &report),
            Err(VerifyFailure::NotEnoughAnswered)
        );
    }

    #[test]
    fn test_matching_rank_by_deck_set() {
        let mut gk = GuildGatekeeper {
            guild_id: 1,
            announce_channel: 2,
            levelup_channels: vec![3],
            restricted_quiz_names: vec!["N1".to_string()],
            ranks: vec![base_rank()],
        };
        let report = base_report();
        assert_eq!(matching_rank(&gk, &report).map(|r| r.name.as_str()), Some("N5"));

        gk.ranks[0].decks = vec!["n4".to_string()];
        assert!(matching_rank(&gk, &report).is_none());
    }

    #[test]
    fn test_restricted_quiz_detection() {
        let gk = GuildGatekeeper {
            guild_id: 1,
            announce_channel: 2,
            levelup_channels: vec![3],
            restricted_quiz_names: vec!["N1".to_string()],
            ranks: vec![base_rank()],
        };
        assert_eq!(restricted_quiz(&gk, "k!q n1 hardcore"), Some("N1"));
        assert_eq!(restricted_quiz(&gk, "k!q n5"), None);
        assert!(is_exact_quiz_command(&gk, "k!q n5"));
        assert!(!is_exact_quiz_command(&gk, "k!q n5 20"));
    }
}
