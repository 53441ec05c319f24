//! Kotori bot: client construction and background scheduling.

pub mod bot;
pub mod scheduler;

pub use bot::KotoriBot;
