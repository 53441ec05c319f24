//! Username cache: gateway cache first, then the database, then REST.

use crate::framework::Data;
use poise::serenity_prelude as serenity;
use std::time::Duration;
use tracing::debug;

/// Resolve a user's display name.
///
/// Fresh names from the gateway cache are written back to the database so
/// leaderboards can name users who have since left.
pub async fn get_username(
    ctx: &serenity::Context,
    data: &Data,
    user_id: serenity::UserId,
) -> String {
    let cached = ctx
        .cache
        .user(user_id)
        .map(|user| user.display_name().to_string());
    if let Some(name) = cached {
        let _ = data.db.upsert_username(user_id.get() as i64, &name).await;
        return name;
    }

    if let Ok(Some(name)) = data.db.cached_username(user_id.get() as i64).await {
        return name;
    }

    // REST fallback, paced behind the advisory lock
    let _guard = data.fetch_lock.lock().await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    match ctx.http.get_user(user_id).await {
        Ok(user) => {
            let name = user.display_name().to_string();
            let _ = data.db.upsert_username(user_id.get() as i64, &name).await;
            name
        }
        Err(e) => {
            debug!("User fetch failed for {user_id}: {e}");
            "Unknown User".to_string()
        }
    }
}
