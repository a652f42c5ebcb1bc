use chrono::Utc;
use sqlx::MySqlPool;
use tracing::{debug, error, info};

use crate::engine::matcher::shift_bounds;
use crate::notify::{self, AttendanceEvent};
use crate::utils::shift_cache;

/// Insert null/null absence markers for every employee who never showed up
/// for a shift that has already ended today.
///
/// Runs hourly. Two passes per shift: employees with zero rows today get a
/// marker outright; employees with rows but no usable check-in get one only
/// when no placeholder exists yet (the idempotence guard). Open shifts are
/// the sweeper's business and are merely counted here.
pub async fn mark_absences_for_today(pool: &MySqlPool) {
    let now = Utc::now().naive_utc();
    let today = now.date();

    let categories = sqlx::query_as::<_, (String,)>("SELECT DISTINCT category FROM shifts")
        .fetch_all(pool)
        .await;

    let categories = match categories {
        Ok(rows) => rows,
        Err(e) => {
            error!(error = %e, "Absence marking failed to list shift categories");
            return;
        }
    };

    for (category,) in categories {
        let shifts = shift_cache::shifts_for_category(pool, &category).await;

        for shift in shifts.iter() {
            let (_, shift_end) = shift_bounds(shift, today);
            if now < shift_end {
                continue; // shift still running (or not started); nothing to mark
            }

            // Pass 1: no attendance rows at all today.
            let missing = sqlx::query_as::<_, (u64,)>(
                r#"
                SELECT e.id FROM employees e
                WHERE e.category = ? AND e.status = 'active'
                  AND NOT EXISTS (
                    SELECT 1 FROM attendance a
                    WHERE a.employee_id = e.id AND a.att_date = ?
                  )
                "#,
            )
            .bind(&category)
            .bind(today)
            .fetch_all(pool)
            .await;

            match missing {
                Ok(rows) => {
                    for (employee_id,) in rows {
                        insert_marker(pool, employee_id, today, &category).await;
                    }
                }
                Err(e) => {
                    error!(error = %e, category, "Absent-employee query failed; skipping cycle");
                    continue;
                }
            }

            // Pass 2: rows exist but none carries a check-in, and no
            // placeholder has been written yet.
            let no_check_in = sqlx::query_as::<_, (u64,)>(
                r#"
                SELECT e.id FROM employees e
                WHERE e.category = ? AND e.status = 'active'
                  AND EXISTS (
                    SELECT 1 FROM attendance a
                    WHERE a.employee_id = e.id AND a.att_date = ?
                  )
                  AND NOT EXISTS (
                    SELECT 1 FROM attendance a
                    WHERE a.employee_id = e.id AND a.att_date = ?
                      AND a.check_in IS NOT NULL
                  )
                  AND NOT EXISTS (
                    SELECT 1 FROM attendance a
                    WHERE a.employee_id = e.id AND a.att_date = ?
                      AND a.check_in IS NULL AND a.check_out IS NULL
                  )
                "#,
            )
            .bind(&category)
            .bind(today)
            .bind(today)
            .bind(today)
            .fetch_all(pool)
            .await;

            match no_check_in {
                Ok(rows) => {
                    for (employee_id,) in rows {
                        insert_marker(pool, employee_id, today, &category).await;
                    }
                }
                Err(e) => {
                    error!(error = %e, category, "No-check-in query failed; skipping cycle");
                }
            }

            // Open punches are left for the auto-checkout sweeper.
            let open = sqlx::query_scalar::<_, i64>(
                r#"
                SELECT COUNT(*) FROM attendance a
                JOIN employees e ON e.id = a.employee_id
                WHERE e.category = ? AND a.att_date = ?
                  AND a.check_in IS NOT NULL AND a.check_out IS NULL
                "#,
            )
            .bind(&category)
            .bind(today)
            .fetch_one(pool)
            .await;

            if let Ok(open) = open {
                if open > 0 {
                    debug!(category, open, "Open shifts left for the sweeper");
                }
            }
        }
    }
}

async fn insert_marker(
    pool: &MySqlPool,
    employee_id: u64,
    today: chrono::NaiveDate,
    category: &str,
) {
    let result = sqlx::query(
        r#"
        INSERT INTO attendance (employee_id, att_date, check_in, check_out)
        VALUES (?, ?, NULL, NULL)
        "#,
    )
    .bind(employee_id)
    .bind(today)
    .execute(pool)
    .await;

    match result {
        Ok(_) => {
            info!(employee_id, category, date = %today, "Marked employee absent");
            notify::emit(AttendanceEvent::AbsenceMarked {
                employee_id,
                date: today,
            });
        }
        Err(e) => {
            error!(error = %e, employee_id, "Failed to insert absence marker");
        }
    }
}
