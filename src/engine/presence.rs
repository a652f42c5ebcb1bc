use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use sqlx::MySqlPool;
use tracing::{debug, warn};

use crate::model::presence::PresenceDetection;

/// Detections older than this are purged by the retention sweep.
pub const DEFAULT_RETENTION_DAYS: i64 = 7;

/// Anti-spoofing decision over raw detection samples.
///
/// A punch is backed by real presence when either enough samples landed in
/// the rolling window, or at least two samples span the required duration.
/// A single static frame can satisfy neither. Zero in-window samples always
/// reject.
pub fn presence_satisfied(
    samples: &[NaiveDateTime],
    now: NaiveDateTime,
    presence_time_sec: i64,
    presence_count: i64,
    presence_window_sec: i64,
) -> bool {
    let cutoff = now - Duration::seconds(presence_window_sec);
    let in_window: Vec<NaiveDateTime> =
        samples.iter().copied().filter(|t| *t >= cutoff).collect();

    if in_window.is_empty() {
        return false;
    }

    if in_window.len() as i64 >= presence_count {
        return true;
    }

    if in_window.len() >= 2 {
        let newest = in_window.iter().max().copied().unwrap_or(now);
        let oldest = in_window.iter().min().copied().unwrap_or(now);
        if (newest - oldest).num_seconds() >= presence_time_sec {
            return true;
        }
    }

    false
}

/// Append one detection sample. No validation: the stream is raw device
/// output and is only ever interpreted by the debounce check.
pub async fn record_detection(
    pool: &MySqlPool,
    employee_id: u64,
    detected_at: NaiveDateTime,
    det_date: NaiveDate,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO presence_detections (employee_id, detected_at, det_date)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(detected_at)
    .bind(det_date)
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetch the employee's samples for the date and run the debounce decision.
/// A store failure fails closed: no proof of presence, punch rejected.
pub async fn check_presence_requirement(
    pool: &MySqlPool,
    employee_id: u64,
    det_date: NaiveDate,
    now: NaiveDateTime,
    presence_time_sec: i64,
    presence_count: i64,
    presence_window_sec: i64,
) -> bool {
    let cutoff = now - Duration::seconds(presence_window_sec);

    let samples = sqlx::query_as::<_, PresenceDetection>(
        r#"
        SELECT *
        FROM presence_detections
        WHERE employee_id = ? AND det_date = ? AND detected_at >= ?
        ORDER BY detected_at DESC
        "#,
    )
    .bind(employee_id)
    .bind(det_date)
    .bind(cutoff)
    .fetch_all(pool)
    .await;

    match samples {
        Ok(rows) => {
            let times: Vec<NaiveDateTime> = rows.into_iter().map(|d| d.detected_at).collect();
            presence_satisfied(
                &times,
                now,
                presence_time_sec,
                presence_count,
                presence_window_sec,
            )
        }
        Err(e) => {
            warn!(error = %e, employee_id, "Presence sample fetch failed; rejecting punch");
            false
        }
    }
}

/// Drop detections past the retention window. Opportunistic; a failed prune
/// just runs again next cycle.
pub async fn prune_stale(pool: &MySqlPool, now: NaiveDateTime, retention_days: i64) {
    let cutoff = now - Duration::days(retention_days);

    match sqlx::query("DELETE FROM presence_detections WHERE detected_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await
    {
        Ok(res) => {
            if res.rows_affected() > 0 {
                debug!(purged = res.rows_affected(), "Pruned stale presence detections");
            }
        }
        Err(e) => warn!(error = %e, "Presence detection prune failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    #[test]
    fn zero_samples_reject() {
        assert!(!presence_satisfied(&[], dt("2026-01-05T09:00:00"), 3, 3, 10));
    }

    #[test]
    fn count_threshold_accepts() {
        let now = dt("2026-01-05T09:00:00");
        let samples = vec![
            dt("2026-01-05T08:59:58"),
            dt("2026-01-05T08:59:57"),
            dt("2026-01-05T08:59:56"),
        ];
        assert!(presence_satisfied(&samples, now, 3, 3, 10));
    }

    #[test]
    fn two_samples_below_count_and_span_reject() {
        // count 3, window 5s, exactly 2 close-together samples
        let now = dt("2026-01-05T09:00:00");
        let samples = vec![dt("2026-01-05T08:59:59"), dt("2026-01-05T08:59:58")];
        assert!(!presence_satisfied(&samples, now, 3, 3, 5));
    }

    #[test]
    fn two_samples_spanning_duration_accept() {
        let now = dt("2026-01-05T09:00:00");
        let samples = vec![dt("2026-01-05T08:59:59"), dt("2026-01-05T08:59:55")];
        assert!(presence_satisfied(&samples, now, 3, 3, 10));
    }

    #[test]
    fn samples_outside_window_are_ignored() {
        let now = dt("2026-01-05T09:00:00");
        // plenty of samples, all stale
        let samples = vec![
            dt("2026-01-05T08:00:00"),
            dt("2026-01-05T08:00:01"),
            dt("2026-01-05T08:00:02"),
            dt("2026-01-05T08:00:03"),
        ];
        assert!(!presence_satisfied(&samples, now, 3, 3, 10));
    }
}
