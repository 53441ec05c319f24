//! Client construction and startup.

use crate::scheduler;
use kotori_commands::{build_framework, Data};
use kotori_common::{KotoriError, Result};
use poise::serenity_prelude as serenity;
use tracing::info;

/// Main bot structure.
pub struct KotoriBot {
    data: Data,
}

impl KotoriBot {
    /// Creates a new bot instance around already-initialized application data.
    pub fn new(data: Data) -> Self {
        Self { data }
    }

    fn intents() -> serenity::GatewayIntents {
        serenity::GatewayIntents::GUILDS
            | serenity::GatewayIntents::GUILD_MEMBERS
            | serenity::GatewayIntents::GUILD_MESSAGES
            | serenity::GatewayIntents::MESSAGE_CONTENT
            | serenity::GatewayIntents::GUILD_MESSAGE_REACTIONS
            | serenity::GatewayIntents::DIRECT_MESSAGES
            | serenity::GatewayIntents::DIRECT_MESSAGE_REACTIONS
            | serenity::GatewayIntents::GUILD_SCHEDULED_EVENTS
            | serenity::GatewayIntents::GUILD_EMOJIS_AND_STICKERS
    }

    /// Starts the bot and blocks until the gateway connection ends.
    pub async fn start(self) -> Result<()> {
        let data = self.data.clone();
        let framework = build_framework(&data.settings)
            .setup(move |ctx, ready, framework| {
                Box::pin(async move {
                    info!("Connected as {}", ready.user.name);
                    poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                    scheduler::spawn_all(ctx.clone(), data.clone());
                    Ok(data)
                })
            })
            .build();

        let token = self.data.settings.discord.token.clone();
        let mut client = serenity::ClientBuilder::new(&token, Self::intents())
            .framework(framework)
            .await
            .map_err(|e| KotoriError::discord(format!("Client build failed: {e}")))?;

        client
            .start()
            .await
            .map_err(|e| KotoriError::discord(format!("Gateway connection failed: {e}")))?;
        Ok(())
    }
}
