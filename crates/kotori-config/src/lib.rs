//! Settings schema and configuration loading for Kotori.

pub mod loader;
pub mod settings;

pub use loader::load_settings;
pub use settings::Settings;
