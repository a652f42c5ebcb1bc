use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;

use crate::engine::timeparse::parse_shift_time;
use crate::model::shift::Shift;

/// Category -> ordered shift catalog. Short TTL: the punch path reads this on
/// every request and shift edits must show up quickly even on other nodes.
static SHIFT_CACHE: Lazy<Cache<String, Arc<Vec<Shift>>>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(10_000)
        .time_to_live(Duration::from_secs(60))
        .build()
});

#[inline]
fn normalize(category: &str) -> String {
    category.trim().to_lowercase()
}

/// Shift catalog for a category, ordered by start time ascending.
///
/// An empty vec means "no shift information available" and every caller
/// treats it as a graceful degrade; a load failure degrades the same way.
/// Empty results are never cached so a freshly configured category is
/// visible immediately.
pub async fn shifts_for_category(pool: &MySqlPool, category: &str) -> Arc<Vec<Shift>> {
    let key = normalize(category);

    if let Some(hit) = SHIFT_CACHE.get(&key).await {
        return hit;
    }

    let shifts = match load_shifts(pool, &key).await {
        Ok(shifts) => shifts,
        Err(e) => {
            log::warn!("Shift catalog load failed for '{}': {}", key, e);
            Vec::new()
        }
    };

    let shifts = Arc::new(shifts);
    if !shifts.is_empty() {
        SHIFT_CACHE.insert(key, shifts.clone()).await;
    }

    shifts
}

/// Drop one category from the cache; call after any shift write.
pub async fn invalidate(category: &str) {
    SHIFT_CACHE.invalidate(&normalize(category)).await;
}

pub fn invalidate_all() {
    SHIFT_CACHE.invalidate_all();
}

async fn load_shifts(pool: &MySqlPool, category: &str) -> Result<Vec<Shift>> {
    let mut shifts = sqlx::query_as::<_, Shift>(
        r#"
        SELECT * FROM shifts WHERE LOWER(category) = ?
        "#,
    )
    .bind(category)
    .fetch_all(pool)
    .await?;

    // "09:00" vs "9:00 AM" don't sort lexically; order on parsed minutes.
    shifts.sort_by_key(|s| parse_shift_time(&s.start_time).minutes_of_day());

    Ok(shifts)
}
