//! Chart rendering for immersion statistics.
//!
//! Everything renders into in-memory buffers: the stats overview as a PNG,
//! the leaderboard race as an animated GIF. Rendering is synchronous and
//! CPU-bound; callers run it on a blocking task.

pub mod overview;
pub mod palette;
pub mod race;

pub use overview::{render_overview_png, DailyStacks};
pub use race::{cumulative_standings, render_race_gif, RaceFrame};
