//! Application configuration structures

use kotori_common::{KotoriError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Discord-related configuration
    pub discord: DiscordSettings,

    /// Database configuration
    pub database: DatabaseSettings,

    /// Logging configuration
    pub logging: LogSettings,

    /// Immersion logging configuration
    pub immersion: ImmersionSettings,

    /// Media catalog API configuration
    pub catalogs: CatalogSettings,

    /// Quiz report API and rank gating configuration
    pub gatekeeper: GatekeeperSettings,

    /// Chat completion API configuration (daily questions)
    pub completion: CompletionSettings,

    /// Per-guild selfmute role configuration
    pub selfmute: Vec<GuildRoles>,

    /// Rank saver configuration
    pub rank_saver: RankSaverSettings,

    /// Per-guild help forum configuration
    pub resolver: Vec<GuildChannels>,

    /// Per-guild daily question channel configuration
    pub daily_question: Vec<GuildChannels>,

    /// Info command topics, keyed by topic name
    pub info_topics: BTreeMap<String, String>,
}

/// Discord bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordSettings {
    /// Discord bot token (usually supplied via `DISCORD_TOKEN`)
    pub token: String,

    /// Prefix for the owner-only text commands
    pub prefix: String,

    /// User ids allowed to run owner-gated commands
    pub owners: Vec<u64>,
}

impl Default for DiscordSettings {
    fn default() -> Self {
        Self {
            token: String::new(),
            prefix: "!".to_string(),
            owners: Vec::new(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite connection URL
    pub url: String,

    /// Maximum number of pooled connections
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://data/kotori.sqlite3".to_string(),
            max_connections: 5,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Log level filter (overridden by `RUST_LOG`)
    pub level: String,

    /// Whether to use colored console output
    pub ansi: bool,

    /// Optional log file path
    pub file: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info,serenity=warn".to_string(),
            ansi: true,
            file: None,
        }
    }
}

/// Immersion logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImmersionSettings {
    /// Channels where log commands are allowed (DMs always work)
    pub allowed_log_channels: Vec<u64>,

    /// Per-unit point multipliers for each media kind
    pub multipliers: Multipliers,
}

impl Default for ImmersionSettings {
    fn default() -> Self {
        Self {
            allowed_log_channels: Vec::new(),
            multipliers: Multipliers::default(),
        }
    }
}

/// Per-unit point multipliers for each media kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Multipliers {
    pub visual_novel: f64,
    pub manga: f64,
    pub anime: f64,
    pub book: f64,
    pub reading_time: f64,
    pub listening_time: f64,
    pub reading: f64,
}

impl Default for Multipliers {
    fn default() -> Self {
        Self {
            visual_novel: 1.0 / 350.0,
            manga: 0.2,
            anime: 13.0,
            book: 1.0,
            reading_time: 0.67,
            listening_time: 0.67,
            reading: 1.0 / 350.0,
        }
    }
}

/// Media catalog API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// AniList GraphQL endpoint
    pub anilist_url: String,

    /// VNDB "kana" API base URL
    pub vndb_url: String,

    /// TMDB API base URL
    pub tmdb_url: String,

    /// TMDB API key (usually supplied via `TMDB_API_KEY`)
    pub tmdb_api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Rate limit, requests per second per catalog
    pub rate_limit_per_sec: u32,

    /// Maximum retry attempts for failed requests
    pub max_retries: usize,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            anilist_url: "https://graphql.anilist.co".to_string(),
            vndb_url: "https://api.vndb.org/kana".to_string(),
            tmdb_url: "https://api.themoviedb.org/3".to_string(),
            tmdb_api_key: None,
            timeout_secs: 30,
            rate_limit_per_sec: 2,
            max_retries: 3,
        }
    }
}

/// Quiz report API and rank gating configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatekeeperSettings {
    /// Base URL of the quiz game-report API
    pub report_api_url: String,

    /// User id of the quiz bot whose report embeds we watch
    pub quiz_bot_id: u64,

    /// Command prefix that identifies quiz invocations
    pub quiz_prefix: String,

    /// Per-guild gating configuration
    pub guilds: Vec<GuildGatekeeper>,
}

impl Default for GatekeeperSettings {
    fn default() -> Self {
        Self {
            report_api_url: "https://kotobaweb.com/api".to_string(),
            quiz_bot_id: 251_239_170_058_616_833,
            quiz_prefix: "k!q".to_string(),
            guilds: Vec::new(),
        }
    }
}

/// Rank gating configuration for a single guild
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildGatekeeper {
    pub guild_id: u64,

    /// Channel where passes and promotions are announced
    pub announce_channel: u64,

    /// Channels in which quiz commands may be issued
    pub levelup_channels: Vec<u64>,

    /// Quiz names that may only run in level-up channels
    pub restricted_quiz_names: Vec<String>,

    /// Rank ladder, lowest first
    pub ranks: Vec<QuizRank>,
}

/// One rung of the quiz rank ladder
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizRank {
    /// Display name of the quiz/rank
    pub name: String,

    /// Exact command users must type to start this quiz
    pub command: String,

    /// Deck short names that make up this quiz
    pub decks: Vec<String>,

    /// Role granted on passing; `None` for pass-only quizzes
    pub role_to_get: Option<u64>,

    /// Whether this rank is earned by combining other passes
    pub combination_rank: bool,

    /// Quiz names required for a combination rank
    pub quizzes_required: Vec<String>,

    /// Required score limit setting
    pub score_limit: i64,

    /// Required answer time limit in milliseconds
    pub answer_time_limit_ms: i64,

    /// Required font, when pinned
    pub font: Option<String>,

    /// Required font size, when pinned
    pub font_size: Option<i64>,

    /// Number of missed questions tolerated
    pub max_missed: i64,

    /// Required foreground color, when pinned
    pub foreground: Option<String>,

    /// Required text effect, when pinned
    pub effect: Option<String>,

    /// Required deck index range, when pinned
    pub deck_range: Option<(i64, i64)>,
}

/// Chat completion API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    /// Chat completion endpoint
    pub api_url: String,

    /// API key (usually supplied via `OPENAI_KEY`); feature disabled when absent
    pub api_key: Option<String>,

    /// Model identifier
    pub model: String,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
        }
    }
}

/// A guild id paired with a set of role ids
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildRoles {
    pub guild_id: u64,
    pub role_ids: Vec<u64>,
}

/// A guild id paired with a set of channel ids
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildChannels {
    pub guild_id: u64,
    pub channel_ids: Vec<u64>,
}

/// Rank saver configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RankSaverSettings {
    /// Roles that are never saved or restored
    pub ignored_role_ids: Vec<u64>,

    /// Per-guild restore announcement channels
    pub announce_channels: Vec<GuildAnnounceChannel>,
}

/// A guild id paired with an announcement channel
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildAnnounceChannel {
    pub guild_id: u64,
    pub channel_id: u64,
}

impl Settings {
    /// Gatekeeper configuration for a guild, when present.
    pub fn gatekeeper_for(&self, guild_id: u64) -> Option<&GuildGatekeeper> {
        self.gatekeeper
            .guilds
            .iter()
            .find(|g| g.guild_id == guild_id)
    }

    /// Selfmute roles configured for a guild.
    pub fn selfmute_roles(&self, guild_id: u64) -> &[u64] {
        self.selfmute
            .iter()
            .find(|g| g.guild_id == guild_id)
            .map(|g| g.role_ids.as_slice())
            .unwrap_or(&[])
    }

    /// Help forum channels configured for a guild.
    pub fn help_forums(&self, guild_id: u64) -> &[u64] {
        self.resolver
            .iter()
            .find(|g| g.guild_id == guild_id)
            .map(|g| g.channel_ids.as_slice())
            .unwrap_or(&[])
    }

    /// Daily question channels configured for a guild.
    pub fn question_channels(&self) -> impl Iterator<Item = (u64, &[u64])> {
        self.daily_question
            .iter()
            .map(|g| (g.guild_id, g.channel_ids.as_slice()))
    }

    /// Rank restore announcement channel for a guild.
    pub fn rank_announce_channel(&self, guild_id: u64) -> Option<u64> {
        self.rank_saver
            .announce_channels
            .iter()
            .find(|g| g.guild_id == guild_id)
            .map(|g| g.channel_id)
    }

    /// Validate the whole configuration.
    pub fn validate(&self) -> Result<()> {
        if self.discord.token.is_empty() {
            return Err(KotoriError::validation_field(
                "Discord token cannot be empty",
                "discord.token",
            ));
        }
        if self.database.url.is_empty() {
            return Err(KotoriError::validation_field(
                "Database URL cannot be empty",
                "database.url",
            ));
        }
        let m = &self.immersion.multipliers;
        for (name, value) in [
            ("visual_novel", m.visual_novel),
            ("manga", m.manga),
            ("anime", m.anime),
            ("book", m.book),
            ("reading_time", m.reading_time),
            ("listening_time", m.listening_time),
            ("reading", m.reading),
        ] {
            if value <= 0.0 {
                return Err(KotoriError::validation_field(
                    format!("Multiplier for {name} must be positive"),
                    format!("immersion.multipliers.{name}"),
                ));
            }
        }
        for guild in &self.gatekeeper.guilds {
            for rank in &guild.ranks {
                if rank.name.is_empty() {
                    return Err(KotoriError::validation("Quiz rank name cannot be empty"));
                }
                if rank.combination_rank {
                    if rank.quizzes_required.is_empty() {
                        return Err(KotoriError::validation(format!(
                            "Combination rank '{}' lists no required quizzes",
                            rank.name
                        )));
                    }
                } else {
                    if rank.command.is_empty() || rank.decks.is_empty() {
                        return Err(KotoriError::validation(format!(
                            "Quiz rank '{}' needs a command and at least one deck",
                            rank.name
                        )));
                    }
                    if rank.score_limit <= 0 {
                        return Err(KotoriError::validation(format!(
                            "Quiz rank '{}' needs a positive score limit",
                            rank.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> Settings {
        Settings {
            discord: DiscordSettings {
                token: "token".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.discord.prefix, "!");
        assert_eq!(settings.database.max_connections, 5);
        assert_eq!(settings.gatekeeper.quiz_prefix, "k!q");
        assert!(settings.completion.api_key.is_none());
        assert!((settings.immersion.multipliers.manga - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_validate_rejects_empty_token() {
        let settings = Settings::default();
        assert!(settings.validate().is_err());
        assert!(valid_settings().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_rank() {
        let mut settings = valid_settings();
        settings.gatekeeper.guilds.push(GuildGatekeeper {
            guild_id: 1,
            ranks: vec![QuizRank {
                name: "N5".to_string(),
                command: String::new(),
                ..Default::default()
            }],
            ..Default::default()
        });
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_guild_accessors() {
        let mut settings = valid_settings();
        settings.selfmute.push(GuildRoles {
            guild_id: 7,
            role_ids: vec![1, 2],
        });
        assert_eq!(settings.selfmute_roles(7), &[1, 2]);
        assert!(settings.selfmute_roles(8).is_empty());
        assert!(settings.gatekeeper_for(7).is_none());
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_src = r#"
            [discord]
            token = "abc"
            owners = [123]

            [immersion]
            allowed_log_channels = [42]

            [[gatekeeper.guilds]]
            guild_id = 1
            announce_channel = 2
            levelup_channels = [3]

            [[gatekeeper.guilds.ranks]]
            name = "N5"
            command = "k!q n5"
            decks = ["n5"]
            score_limit = 10
            answer_time_limit_ms = 16000
            max_missed = 2

            [info_topics]
            faq = "Read the FAQ first."
        "#;
        let settings: Settings = toml::from_str(toml_src).unwrap();
        assert_eq!(settings.discord.owners, vec![123]);
        assert_eq!(settings.immersion.allowed_log_channels, vec![42]);
        let guild = settings.gatekeeper_for(1).unwrap();
        assert_eq!(guild.ranks[0].score_limit, 10);
        assert_eq!(settings.info_topics["faq"], "Read the FAQ first.");
        assert!(settings.validate().is_ok());
    }
}
