//! Fixed-interval background loops.
//!
//! Every cog sweep is a plain async function over `(Context, Data)`; this
//! module drives them on their intervals. A failing tick is logged and the
//! loop keeps going.

use kotori_commands::{Data, Error};
use poise::serenity_prelude as serenity;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, warn};

type TickFuture<'a> = Pin<Box<dyn Future<Output = Result<(), Error>> + Send + 'a>>;
type TickFn = for<'a> fn(&'a serenity::Context, &'a Data) -> TickFuture<'a>;

/// One recurring sweep.
pub struct PeriodicTask {
    pub name: &'static str,
    pub period: Duration,
    tick: TickFn,
}

/// Every background loop the bot runs.
const TASKS: &[PeriodicTask] = &[
    PeriodicTask {
        name: "mute-sweeper",
        period: Duration::from_secs(60),
        tick: |ctx, data| Box::pin(kotori_commands::selfmute::sweep_expired(ctx, data)),
    },
    PeriodicTask {
        name: "event-role-sync",
        period: Duration::from_secs(60),
        tick: |ctx, data| Box::pin(kotori_commands::event_roles::sync_event_roles(ctx, data)),
    },
    PeriodicTask {
        name: "auto-receive",
        period: Duration::from_secs(60),
        tick: |ctx, data| Box::pin(kotori_commands::auto_receive::give_auto_roles(ctx, data)),
    },
    PeriodicTask {
        name: "daily-question",
        period: Duration::from_secs(60),
        tick: |ctx, data| {
            Box::pin(kotori_commands::daily_question::check_daily_questions(ctx, data))
        },
    },
    PeriodicTask {
        name: "rank-saver",
        period: Duration::from_secs(600),
        tick: |ctx, data| Box::pin(kotori_commands::rank_saver::save_ranks(ctx, data)),
    },
    PeriodicTask {
        name: "custom-role-strip",
        period: Duration::from_secs(200 * 60),
        tick: |ctx, data| Box::pin(kotori_commands::custom_roles::strip_stale_roles(ctx, data)),
    },
    PeriodicTask {
        name: "thread-resolver",
        period: Duration::from_secs(3600),
        tick: |ctx, data| Box::pin(kotori_commands::resolver::ask_if_solved(ctx, data)),
    },
];

/// Spawn every background loop. Called once, after the gateway is ready.
pub fn spawn_all(ctx: serenity::Context, data: Data) {
    for task in TASKS {
        let ctx = ctx.clone();
        let data = data.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(task.period);
            // The first tick fires immediately; skip it so the cache can warm up
            interval.tick().await;
            loop {
                interval.tick().await;
                debug!("Running {}", task.name);
                if let Err(e) = (task.tick)(&ctx, &data).await {
                    warn!("{} tick failed: {e}", task.name);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_task_has_a_sane_period() {
        for task in TASKS {
            assert!(task.period >= Duration::from_secs(60), "{}", task.name);
        }
        // No duplicate names
        let mut names: Vec<_> = TASKS.iter().map(|task| task.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), TASKS.len());
    }
}
