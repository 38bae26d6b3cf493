use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use moka::future::Cache;
use once_cell::sync::Lazy;
use std::time::Duration;

use crate::db::Db;

/// true  => username is TAKEN
/// only taken names are stored
pub static USERNAME_CACHE: Lazy<Cache<String, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(500_000)
        .time_to_live(Duration::from_secs(86400)) // 24h TTL
        .build()
});

/// Mark a single username as taken
pub async fn mark_taken(username: &str) {
    USERNAME_CACHE
        .insert(username.trim().to_lowercase(), true)
        .await;
}

/// Check if username is taken
pub async fn is_taken(username: &str) -> bool {
    USERNAME_CACHE
        .get(&username.trim().to_lowercase())
        .await
        .unwrap_or(false)
}

/// Batch mark usernames as taken
async fn batch_mark(usernames: &[String]) {
    let futures: Vec<_> = usernames
        .iter()
        .map(|u| USERNAME_CACHE.insert(u.to_lowercase(), true))
        .collect();

    futures::future::join_all(futures).await;
}

/// Load only users who logged in during the last `days` into the cache
pub async fn warmup_username_cache(db: &Db, days: u32, batch_size: usize) -> Result<()> {
    let since = Utc::now() - ChronoDuration::days(i64::from(days));
    let mut recent = db
        .users
        .find(|u| u.last_login_at.is_some_and(|at| at >= since))
        .await?;
    recent.sort_by(|a, b| b.last_login_at.cmp(&a.last_login_at));

    let names: Vec<String> = recent.into_iter().map(|u| u.username).collect();
    for batch in names.chunks(batch_size.max(1)) {
        batch_mark(batch).await;
    }

    log::info!(
        "Username cache warmup complete: {} recent users (last {} days)",
        names.len(),
        days
    );

    Ok(())
}
