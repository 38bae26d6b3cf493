use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures_util::StreamExt;
use futures_util::stream;
use once_cell::sync::Lazy;
use std::sync::RwLock;

use crate::db::Db;

/// Expected capacity and false-positive rate.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static USERNAME_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

#[inline]
fn normalize(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Check if a username might exist (false positives possible).
/// A poisoned filter answers "maybe" so callers fall back to the store.
pub fn might_exist(username: &str) -> bool {
    let username = normalize(username);
    match USERNAME_FILTER.read() {
        Ok(filter) => filter.contains(&username),
        Err(_) => true,
    }
}

/// Insert a single username into the filter
pub fn insert(username: &str) {
    let username = normalize(username);
    if let Ok(mut filter) = USERNAME_FILTER.write() {
        filter.add(&username);
    }
}

/// Warm up the filter from the users collection, in batches
pub async fn warmup_username_filter(db: &Db, batch_size: usize) -> Result<()> {
    let users = db
        .users
        .all()
        .await
        .map_err(|e| anyhow!("users fetch failed: {}", e))?;

    let mut batches = stream::iter(users.into_iter().map(|u| normalize(&u.username)))
        .chunks(batch_size.max(1));

    let mut total = 0usize;
    while let Some(batch) = batches.next().await {
        total += batch.len();
        insert_batch(&batch)?;
    }

    log::info!("Username filter warmup complete: {} users", total);
    Ok(())
}

/// Insert a batch of normalized usernames
fn insert_batch(usernames: &[String]) -> Result<()> {
    let mut filter = USERNAME_FILTER
        .write()
        .map_err(|_| anyhow!("username filter poisoned"))?;

    for username in usernames {
        filter.add(username);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_names_are_found_case_insensitively() {
        let name = format!("Filter-{}", uuid::Uuid::new_v4());
        insert(&name);
        assert!(might_exist(&name.to_uppercase()));
    }
}
