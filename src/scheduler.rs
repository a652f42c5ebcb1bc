//! Timer-driven background jobs.
//!
//! The auto-checkout sweeper and the absence marker run on fixed intervals,
//! independent of request traffic and of each other. Each tick swallows and
//! logs its own failures so a bad cycle never kills the loop.

use std::time::Duration;

use sqlx::MySqlPool;
use tracing::info;

use crate::config::Config;
use crate::engine::{absence, presence, sweeper};

pub fn spawn_background_jobs(pool: MySqlPool, config: &Config) {
    let sweep_every = Duration::from_secs(config.sweep_interval_secs);
    let absence_every = Duration::from_secs(config.absence_interval_secs);
    let retention_days = config.presence_retention_days;
    let min_ot_minutes = config.min_ot_minutes;

    info!(
        sweep_secs = config.sweep_interval_secs,
        absence_secs = config.absence_interval_secs,
        "Starting background jobs"
    );

    let sweep_pool = pool.clone();
    actix_web::rt::spawn(async move {
        let mut ticker = actix_web::rt::time::interval(sweep_every);
        loop {
            ticker.tick().await;
            sweeper::sweep_overdue_checkouts(&sweep_pool, min_ot_minutes).await;
        }
    });

    let absence_pool = pool.clone();
    actix_web::rt::spawn(async move {
        let mut ticker = actix_web::rt::time::interval(absence_every);
        loop {
            ticker.tick().await;
            absence::mark_absences_for_today(&absence_pool).await;
        }
    });

    // Daily retention prune for presence detections.
    actix_web::rt::spawn(async move {
        let mut ticker = actix_web::rt::time::interval(Duration::from_secs(86_400));
        loop {
            ticker.tick().await;
            let now = chrono::Utc::now().naive_utc();
            presence::prune_stale(&pool, now, retention_days).await;
        }
    });
}
