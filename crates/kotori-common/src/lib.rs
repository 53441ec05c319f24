//! Common utilities and types for the Kotori bot workspace.

pub mod error;
pub mod logging;
pub mod utils;

pub use error::{KotoriError, Result};
