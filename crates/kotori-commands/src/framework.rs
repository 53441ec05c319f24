//! Poise framework setup, shared data and command registration.

use kotori_config::Settings;
use kotori_db::Db;
use kotori_media::{AnilistClient, CompletionClient, QuizReportClient, TmdbClient, VndbClient};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Application data accessible in all commands and event handlers.
pub struct DataInner {
    /// Application configuration
    pub settings: Arc<Settings>,
    /// Database handle
    pub db: Db,
    /// AniList catalog client
    pub anilist: AnilistClient,
    /// VNDB catalog client
    pub vndb: VndbClient,
    /// TMDB catalog client; absent without an API key
    pub tmdb: Option<TmdbClient>,
    /// Quiz game-report client
    pub quiz_reports: QuizReportClient,
    /// Chat completion client; absent without an API key
    pub completion: Option<CompletionClient>,
    /// Advisory lock pacing REST fallback fetches (users, messages)
    pub fetch_lock: tokio::sync::Mutex<()>,
}

/// Shared handle to the application data.
pub type Data = Arc<DataInner>;

/// Application error type for commands.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Command context type.
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Application command context type, used by autocomplete callbacks.
pub type AppContext<'a> = poise::ApplicationContext<'a, Data, Error>;

/// Creates the Poise framework with every command and event handler wired up.
pub fn build_framework(settings: &Settings) -> poise::FrameworkBuilder<Data, Error> {
    let owners = settings
        .discord
        .owners
        .iter()
        .map(|id| serenity::UserId::new(*id))
        .collect();

    poise::Framework::builder().options(poise::FrameworkOptions {
        commands: vec![
            crate::admin::post_db(),
            crate::admin::register(),
            crate::auto_receive::add_auto_receive(),
            crate::auto_receive::remove_auto_receive(),
            crate::auto_receive::ban_auto_receive(),
            crate::auto_receive::unban_auto_receive(),
            crate::bookmarks::bookmarkboard(),
            crate::bookmarks::checkbookmarks(),
            crate::custom_roles::make_custom_role(),
            crate::custom_roles::delete_custom_role(),
            crate::custom_roles::create_custom_role_settings(),
            crate::immersion_goals::log_set_goal(),
            crate::immersion_goals::log_remove_goal(),
            crate::immersion_goals::log_view_goals(),
            crate::immersion_goals::log_clear_goals(),
            crate::immersion_log::log(),
            crate::immersion_log::log_undo(),
            crate::immersion_log::log_achievements(),
            crate::immersion_log::log_export(),
            crate::immersion_log::logs(),
            crate::immersion_log::log_leaderboard(),
            crate::immersion_race::log_race(),
            crate::immersion_stats::log_stats(),
            crate::info::info(),
            crate::info::help(),
            crate::kneels::kneelderboard(),
            crate::resolver::solved(),
            crate::selfmute::selfmute(),
            crate::selfmute::unmute_user(),
            crate::sticky::sticky_last_message(),
            crate::sticky::unsticky(),
        ],
        event_handler: |ctx, event, framework, data| {
            Box::pin(crate::events::event_handler(ctx, event, framework, data))
        },
        prefix_options: poise::PrefixFrameworkOptions {
            prefix: Some(settings.discord.prefix.clone()),
            ..Default::default()
        },
        owners,
        pre_command: |ctx| {
            Box::pin(async move {
                info!(
                    command = %ctx.command().qualified_name,
                    user = %ctx.author().id,
                    "Command invoked"
                );
            })
        },
        post_command: |ctx| {
            Box::pin(async move {
                info!(
                    command = %ctx.command().qualified_name,
                    "Command completed"
                );
            })
        },
        on_error: |error| Box::pin(on_error(error)),
        ..Default::default()
    })
}

/// Report command errors to the invoker and the log.
async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!(
                command = %ctx.command().qualified_name,
                "Command failed: {error}"
            );
            let _ = ctx.say("Something went wrong running that command.").await;
        }
        poise::FrameworkError::CommandCheckFailed { ctx, .. } => {
            let _ = ctx.say("You are not allowed to use this command.").await;
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                warn!("Error handler failed: {e}");
            }
        }
    }
}

/// Read a sibling option's raw value during autocomplete.
///
/// Autocomplete callbacks only receive the focused option; the rest of the
/// half-filled command has to be read from the interaction payload.
pub fn sibling_option<'a>(ctx: &'a AppContext<'_>, name: &str) -> Option<&'a str> {
    ctx.interaction
        .data
        .options
        .iter()
        .find(|option| option.name == name)
        .and_then(|option| match &option.value {
            serenity::CommandDataOptionValue::String(value) => Some(value.as_str()),
            serenity::CommandDataOptionValue::Autocomplete { value, .. } => Some(value.as_str()),
            _ => None,
        })
}

/// Parse a media kind choice out of a raw option value.
pub fn media_kind_from_option(value: &str) -> Option<kotori_media::MediaKind> {
    use poise::ChoiceParameter;
    kotori_media::MediaKind::from_name(value).or_else(|| {
        value
            .parse::<usize>()
            .ok()
            .and_then(kotori_media::MediaKind::from_index)
    })
}

/// Whether an interaction channel is allowed for immersion commands:
/// a configured log channel, or any DM.
pub fn is_log_channel(ctx: &Context<'_>) -> bool {
    if ctx.guild_id().is_none() {
        return true;
    }
    ctx.data()
        .settings
        .immersion
        .allowed_log_channels
        .contains(&ctx.channel_id().get())
}
