//! Slash commands, autocomplete callbacks and gateway event handlers.
//!
//! Each module is one self-contained cog. The framework module owns the
//! shared [`Data`] and wires every command and event handler into poise.

pub mod achievements;
pub mod admin;
pub mod auto_receive;
pub mod bookmarks;
pub mod catalog_search;
pub mod custom_roles;
pub mod daily_question;
pub mod event_roles;
pub mod events;
pub mod framework;
pub mod gatekeeper;
pub mod immersion_goals;
pub mod immersion_log;
pub mod immersion_race;
pub mod immersion_stats;
pub mod info;
pub mod kneels;
pub mod rank_saver;
pub mod resolver;
pub mod selfmute;
pub mod sticky;
pub mod usernames;

pub use framework::{build_framework, AppContext, Context, Data, DataInner, Error};
