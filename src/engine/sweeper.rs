use chrono::{Duration, NaiveDateTime, Utc};
use sqlx::MySqlPool;
use tracing::{debug, error, info, warn};

use crate::engine::matcher::{detect_shift_for_time, shift_bounds};
use crate::engine::metrics::{compute_metrics, round2};
use crate::model::attendance::Attendance;
use crate::model::shift::Shift;
use crate::notify::{self, AttendanceEvent};
use crate::utils::shift_cache;

/// When the shift window plus grace has passed with no check-out, the record
/// is closed at exactly this timestamp (never at sweep time).
pub fn checkout_deadline(shift: &Shift, check_in: NaiveDateTime) -> NaiveDateTime {
    let (_, end) = shift_bounds(shift, check_in.date());
    end + Duration::minutes(shift.grace_after_min.unwrap_or(0))
}

/// Force-close every open attendance record whose deadline has passed.
///
/// Idempotent and retry-safe: the close is a compare-and-set on
/// `check_out IS NULL`, so a record concurrently closed by a live check-out
/// (or an earlier sweep) is simply skipped. Per-record failures are logged
/// and do not abort the cycle.
pub async fn sweep_overdue_checkouts(pool: &MySqlPool, min_ot_minutes: i64) {
    let now = Utc::now().naive_utc();

    let open = sqlx::query_as::<_, Attendance>(
        r#"
        SELECT * FROM attendance
        WHERE check_out IS NULL AND check_in IS NOT NULL
        "#,
    )
    .fetch_all(pool)
    .await;

    let open = match open {
        Ok(rows) => rows,
        Err(e) => {
            error!(error = %e, "Sweep failed to list open attendance records");
            return;
        }
    };

    if open.is_empty() {
        return;
    }

    debug!(open = open.len(), "Sweeping open attendance records");

    for record in open {
        let Some(check_in) = record.check_in else {
            continue;
        };

        let category = sqlx::query_scalar::<_, String>(
            "SELECT category FROM employees WHERE id = ?",
        )
        .bind(record.employee_id)
        .fetch_optional(pool)
        .await;

        let category = match category {
            Ok(Some(c)) => c,
            Ok(None) => {
                warn!(record_id = record.id, employee_id = record.employee_id,
                    "Open record for unknown employee; skipping");
                continue;
            }
            Err(e) => {
                error!(error = %e, record_id = record.id, "Employee lookup failed; skipping");
                continue;
            }
        };

        let shifts = shift_cache::shifts_for_category(pool, &category).await;
        if shifts.is_empty() {
            warn!(record_id = record.id, category, "No shifts configured; cannot sweep record");
            continue;
        }

        let Some(matched) = detect_shift_for_time(&shifts, check_in) else {
            continue;
        };

        let deadline = checkout_deadline(matched.shift, check_in);
        if now < deadline {
            continue;
        }

        let metrics = compute_metrics(check_in, deadline, &shifts, false, min_ot_minutes);

        // A manual OT override outlives any recomputation.
        let (ot_hours, total_hours) = if record.ot_manual {
            (record.ot_hours, round2(metrics.total_hours + record.ot_hours))
        } else {
            (metrics.ot_hours, metrics.total_hours)
        };

        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out = ?, delay_minutes = ?, extra_minutes = ?,
                total_hours = ?, ot_hours = ?
            WHERE id = ? AND check_out IS NULL
            "#,
        )
        .bind(deadline)
        .bind(metrics.delay_minutes)
        .bind(metrics.extra_minutes)
        .bind(total_hours)
        .bind(ot_hours)
        .bind(record.id)
        .execute(pool)
        .await;

        match result {
            Ok(res) if res.rows_affected() > 0 => {
                info!(
                    record_id = record.id,
                    employee_id = record.employee_id,
                    check_out = %deadline,
                    "Auto-closed overdue attendance record"
                );
                notify::emit(AttendanceEvent::AutoClosed {
                    employee_id: record.employee_id,
                    record_id: record.id,
                    closed_at: deadline,
                });
            }
            Ok(_) => {
                // lost the race to a live check-out: nothing to do
                debug!(record_id = record.id, "Record already closed; sweep skipped it");
            }
            Err(e) => {
                error!(error = %e, record_id = record.id, "Auto-close update failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift(start: &str, end: &str, after: Option<i64>) -> Shift {
        Shift {
            id: 1,
            name: "day".into(),
            category: "production".into(),
            start_time: start.into(),
            end_time: end.into(),
            grace_before_min: None,
            grace_after_min: after,
            presence_time_sec: None,
            presence_count: None,
            presence_window_sec: None,
            created_at: None,
        }
    }

    fn dt(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    #[test]
    fn deadline_is_shift_end_plus_grace() {
        let s = shift("09:00", "17:00", Some(30));
        assert_eq!(
            checkout_deadline(&s, dt("2026-01-05T08:55:00")),
            dt("2026-01-05T17:30:00")
        );
    }

    #[test]
    fn deadline_without_grace_is_shift_end() {
        let s = shift("09:00", "17:00", None);
        assert_eq!(
            checkout_deadline(&s, dt("2026-01-05T09:05:00")),
            dt("2026-01-05T17:00:00")
        );
    }

    #[test]
    fn overnight_deadline_lands_on_next_day() {
        let s = shift("22:00", "06:00", Some(15));
        assert_eq!(
            checkout_deadline(&s, dt("2026-01-05T22:10:00")),
            dt("2026-01-06T06:15:00")
        );
    }
}
