//! Main entry point for the Kotori bot.

use kotori_bot::KotoriBot;
use kotori_commands::DataInner;
use kotori_common::logging::{init_logging, LoggingConfig};
use kotori_db::Db;
use kotori_media::{AnilistClient, CompletionClient, QuizReportClient, TmdbClient, VndbClient};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env variables if present.
    dotenvy::dotenv().ok();

    let config_path = std::env::args().nth(1);
    let settings = Arc::new(kotori_config::load_settings(config_path.as_deref())?);

    init_logging(&LoggingConfig {
        level: settings.logging.level.clone(),
        ansi: settings.logging.ansi,
        file_path: settings.logging.file.clone(),
    })?;
    info!("Starting Kotori");

    let db = Db::connect(&settings.database.url, settings.database.max_connections).await?;
    db.init_schema().await?;

    let catalogs = &settings.catalogs;
    let anilist = AnilistClient::new(
        &catalogs.anilist_url,
        catalogs.timeout_secs,
        catalogs.rate_limit_per_sec,
        catalogs.max_retries,
    )?;
    let vndb = VndbClient::new(
        &catalogs.vndb_url,
        catalogs.timeout_secs,
        catalogs.rate_limit_per_sec,
        catalogs.max_retries,
    )?;
    let tmdb = match &catalogs.tmdb_api_key {
        Some(key) => Some(TmdbClient::new(
            &catalogs.tmdb_url,
            key,
            catalogs.timeout_secs,
            catalogs.rate_limit_per_sec,
            catalogs.max_retries,
        )?),
        None => {
            info!("No TMDB API key configured; listening autocomplete is cache-only");
            None
        }
    };
    let quiz_reports = QuizReportClient::new(
        &settings.gatekeeper.report_api_url,
        catalogs.timeout_secs,
    )?;
    let completion = match &settings.completion.api_key {
        Some(key) => Some(CompletionClient::new(
            &settings.completion.api_url,
            key,
            &settings.completion.model,
        )?),
        None => {
            info!("No completion API key configured; daily questions disabled");
            None
        }
    };

    let data = Arc::new(DataInner {
        settings,
        db,
        anilist,
        vndb,
        tmdb,
        quiz_reports,
        completion,
        fetch_lock: tokio::sync::Mutex::new(()),
    });

    let bot = KotoriBot::new(data);
    tokio::select! {
        result = bot.start() => {
            if let Err(e) = result {
                error!("Bot stopped with error: {e}");
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }
    Ok(())
}
