use std::collections::HashMap;

use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::engine::matcher::{detect_shift_for_time, find_shift_for_punch_with_grace, shift_bounds};
use crate::engine::metrics::{compute_metrics, derive_report_hours, round2};
use crate::engine::presence;
use crate::model::attendance::Attendance;
use crate::notify::{self, AttendanceEvent};
use crate::utils::{employee_filter, shift_cache};

#[derive(Deserialize, ToSchema)]
pub struct PunchRequest {
    /// Employee code resolved by the recognition capability.
    #[schema(example = "EMP-001")]
    pub employee_code: String,
    #[schema(example = "HQ gate 2", nullable = true)]
    pub location: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct DetectRequest {
    #[schema(example = "EMP-001")]
    pub employee_code: String,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AttendanceQuery {
    pub employee_id: Option<u64>,
    #[param(value_type = Option<String>)]
    #[schema(value_type = Option<String>, format = "date")]
    pub from: Option<NaiveDate>,
    #[param(value_type = Option<String>)]
    #[schema(value_type = Option<String>, format = "date")]
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateAttendance {
    #[schema(example = "2026-01-05T09:05:00", value_type = String, format = "date-time", nullable = true)]
    pub check_in: Option<NaiveDateTime>,
    #[schema(example = "2026-01-05T17:00:00", value_type = String, format = "date-time", nullable = true)]
    pub check_out: Option<NaiveDateTime>,
    #[schema(example = "forgot to punch out", nullable = true)]
    pub remark: Option<String>,
    /// Manual overtime override; once set it wins over every recomputation.
    #[schema(example = 1.5, nullable = true)]
    pub ot_hours: Option<f64>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceReportRow {
    #[serde(flatten)]
    pub record: Attendance,
    /// Shift-relative regular hours; null for absence markers and open rows.
    pub regular_hours: Option<f64>,
    pub early_checkout_minutes: Option<i64>,
    /// Reported total after the manual-OT/auto-OT/actual three-way rule.
    pub reported_total_hours: Option<f64>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<AttendanceReportRow>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

#[derive(sqlx::FromRow)]
struct PunchEmployee {
    id: u64,
    category: String,
    status: String,
}

/// Resolve the punching employee, shedding unknown codes on the in-memory
/// filter before touching the database.
async fn resolve_employee(
    code: &str,
    pool: &MySqlPool,
) -> Result<PunchEmployee, HttpResponse> {
    if !employee_filter::might_exist(code) {
        return Err(HttpResponse::NotFound().json(json!({
            "message": "Unknown employee code"
        })));
    }

    let employee = sqlx::query_as::<_, PunchEmployee>(
        r#"
        SELECT id, category, status FROM employees WHERE employee_code = ?
        "#,
    )
    .bind(code.trim().to_uppercase())
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        error!(error = %e, code, "Employee lookup failed");
        HttpResponse::InternalServerError().json(json!({"message": "Internal Server Error"}))
    })?;

    match employee {
        Some(emp) if emp.status == "active" => Ok(emp),
        Some(_) => Err(HttpResponse::BadRequest().json(json!({
            "message": "Employee is not active"
        }))),
        // filter false positive
        None => Err(HttpResponse::NotFound().json(json!({
            "message": "Unknown employee code"
        }))),
    }
}

/// Presence detection sample endpoint
///
/// Devices stream one sample per recognition frame; samples only ever feed
/// the debounce check on check-in.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/detect",
    request_body = DetectRequest,
    responses(
        (status = 200, description = "Sample recorded", body = Object, example = json!({
            "recorded": true
        })),
        (status = 404, description = "Unknown employee code"),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn detect(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<DetectRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_punch_source()?;

    let employee = match resolve_employee(&payload.employee_code, pool.get_ref()).await {
        Ok(emp) => emp,
        Err(resp) => return Ok(resp),
    };

    let now = Utc::now().naive_utc();

    if let Err(e) = presence::record_detection(pool.get_ref(), employee.id, now, now.date()).await {
        error!(error = %e, employee_id = employee.id, "Failed to record detection");
        return Err(ErrorInternalServerError("Internal Server Error"));
    }

    Ok(HttpResponse::Ok().json(json!({ "recorded": true })))
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-in",
    request_body = PunchRequest,
    responses(
        (status = 200, description = "Checked in successfully", body = Object, example = json!({
            "message": "Checked in successfully",
            "shift": "Morning"
        })),
        (status = 400, description = "Already checked in / no shifts configured / presence not satisfied"),
        (status = 404, description = "Unknown employee code"),
        (status = 401),
        (status = 403),
        (status = 500)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<PunchRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_punch_source()?;

    let employee = match resolve_employee(&payload.employee_code, pool.get_ref()).await {
        Ok(emp) => emp,
        Err(resp) => return Ok(resp),
    };

    let now = Utc::now().naive_utc();
    let today = now.date();

    let shifts = shift_cache::shifts_for_category(pool.get_ref(), &employee.category).await;
    if shifts.is_empty() {
        warn!(category = %employee.category, "Check-in with no shifts configured");
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "No shifts configured for employee category"
        })));
    }

    // never None for a non-empty catalog
    let Some(matched) = find_shift_for_punch_with_grace(&shifts, now) else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "No shifts configured for employee category"
        })));
    };

    // Debounce: enforced only when the shift carries thresholds. A missing
    // criterion must not auto-pass, hence the MAX defaults.
    let enforce = matched.shift.presence_window_sec.is_some()
        && (matched.shift.presence_count.is_some() || matched.shift.presence_time_sec.is_some());
    if enforce {
        let ok = presence::check_presence_requirement(
            pool.get_ref(),
            employee.id,
            today,
            now,
            matched.shift.presence_time_sec.unwrap_or(i64::MAX),
            matched.shift.presence_count.unwrap_or(i64::MAX),
            matched.shift.presence_window_sec.unwrap_or(0),
        )
        .await;

        if !ok {
            info!(employee_id = employee.id, "Presence requirement not satisfied");
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Presence requirement not satisfied"
            })));
        }
    }

    // Duplicate open punch for today
    let open = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM attendance
            WHERE employee_id = ? AND att_date = ?
              AND check_in IS NOT NULL AND check_out IS NULL
        )
        "#,
    )
    .bind(employee.id)
    .bind(today)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id = employee.id, "Open-record check failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if open {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Already checked in"
        })));
    }

    sqlx::query(
        r#"
        INSERT INTO attendance (employee_id, att_date, check_in, check_in_location)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(employee.id)
    .bind(today)
    .bind(now)
    .bind(&payload.location)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id = employee.id, "Check-in failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let shift_name = matched.shift.name.clone();

    notify::emit(AttendanceEvent::CheckedIn {
        employee_id: employee.id,
        at: now,
        shift_name: shift_name.clone(),
    });

    Ok(HttpResponse::Ok().json(json!({
        "message": "Checked in successfully",
        "shift": shift_name
    })))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-out",
    request_body = PunchRequest,
    responses(
        (status = 200, description = "Checked out successfully", body = Object, example = json!({
            "message": "Checked out successfully",
            "total_hours": 8.92,
            "ot_hours": 0.75
        })),
        (status = 400, description = "No active check-in found"),
        (status = 404, description = "Unknown employee code"),
        (status = 409, description = "Record already closed"),
        (status = 401),
        (status = 403),
        (status = 500)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<PunchRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_punch_source()?;

    let employee = match resolve_employee(&payload.employee_code, pool.get_ref()).await {
        Ok(emp) => emp,
        Err(resp) => return Ok(resp),
    };

    let now = Utc::now().naive_utc();
    let yesterday = now.date() - Duration::days(1);

    // Most recent open record; yesterday included so an overnight shift can
    // close after midnight.
    let record = sqlx::query_as::<_, Attendance>(
        r#"
        SELECT * FROM attendance
        WHERE employee_id = ? AND att_date >= ?
          AND check_in IS NOT NULL AND check_out IS NULL
        ORDER BY att_date DESC, check_in DESC
        LIMIT 1
        "#,
    )
    .bind(employee.id)
    .bind(yesterday)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id = employee.id, "Open-record lookup failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let Some(record) = record else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "No active check-in found"
        })));
    };
    let check_in = record.check_in.unwrap_or(now);

    // A punch after an already-closed one today is an OT-context punch.
    let closed_today = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM attendance
        WHERE employee_id = ? AND att_date = ? AND check_out IS NOT NULL AND id != ?
        "#,
    )
    .bind(employee.id)
    .bind(record.att_date)
    .bind(record.id)
    .fetch_one(pool.get_ref())
    .await
    .unwrap_or(0);

    let shifts = shift_cache::shifts_for_category(pool.get_ref(), &employee.category).await;

    // Degrades to zeros on inverted pair or empty catalog.
    let metrics = compute_metrics(check_in, now, &shifts, closed_today > 0, config.min_ot_minutes);

    let (ot_hours, total_hours) = if record.ot_manual {
        (record.ot_hours, round2(metrics.total_hours + record.ot_hours))
    } else {
        (metrics.ot_hours, metrics.total_hours)
    };

    let result = sqlx::query(
        r#"
        UPDATE attendance
        SET check_out = ?, check_out_location = ?, delay_minutes = ?,
            extra_minutes = ?, total_hours = ?, ot_hours = ?
        WHERE id = ? AND check_out IS NULL
        "#,
    )
    .bind(now)
    .bind(&payload.location)
    .bind(metrics.delay_minutes)
    .bind(metrics.extra_minutes)
    .bind(total_hours)
    .bind(ot_hours)
    .bind(record.id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, record_id = record.id, "Check-out failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        // lost the race to the sweeper
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "Record already closed"
        })));
    }

    notify::emit(AttendanceEvent::CheckedOut {
        employee_id: employee.id,
        at: now,
        ot_hours,
    });

    Ok(HttpResponse::Ok().json(json!({
        "message": "Checked out successfully",
        "total_hours": total_hours,
        "ot_hours": ot_hours
    })))
}

/// Attendance listing with derived report hours
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Paginated attendance list", body = AttendanceListResponse),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceQuery>,
) -> actix_web::Result<impl Responder> {
    // employees see only themselves; back-office roles see everything
    let employee_scope = if auth.is_employee() {
        match auth.employee_id {
            Some(id) => Some(id),
            None => return Err(actix_web::error::ErrorForbidden("No employee profile")),
        }
    } else {
        query.employee_id
    };

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut conditions = Vec::new();
    let mut bindings: Vec<sqlx::types::JsonValue> = Vec::new();

    if let Some(employee_id) = employee_scope {
        conditions.push("employee_id = ?");
        bindings.push(employee_id.into());
    }

    if let Some(from) = query.from {
        conditions.push("att_date >= ?");
        bindings.push(from.to_string().into());
    }

    if let Some(to) = query.to {
        conditions.push("att_date <= ?");
        bindings.push(to.to_string().into());
    }

    let where_clause = if conditions.is_empty() {
        "".to_string()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) as total FROM attendance {}", where_clause);
    debug!(sql = %count_sql, "Counting attendance records");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = count_query.bind(b);
    }

    let total = count_query.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count attendance records");
        ErrorInternalServerError("Database error")
    })?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT * FROM attendance {} ORDER BY att_date DESC, id DESC LIMIT ? OFFSET ?",
        where_clause
    );

    let mut data_query = sqlx::query_as::<_, Attendance>(&data_sql);
    for b in &bindings {
        data_query = data_query.bind(b);
    }
    data_query = data_query.bind(per_page as i64).bind(offset as i64);

    let records = data_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to fetch attendance records");
        ErrorInternalServerError("Database error")
    })?;

    // ---------- derive report hours per row ----------
    let mut categories: HashMap<u64, String> = HashMap::new();
    let mut data = Vec::with_capacity(records.len());

    for record in records {
        let row = build_report_row(pool.get_ref(), record, &mut categories).await;
        data.push(row);
    }

    Ok(HttpResponse::Ok().json(AttendanceListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

async fn build_report_row(
    pool: &MySqlPool,
    record: Attendance,
    categories: &mut HashMap<u64, String>,
) -> AttendanceReportRow {
    let (Some(check_in), Some(check_out)) = (record.check_in, record.check_out) else {
        return AttendanceReportRow {
            record,
            regular_hours: None,
            early_checkout_minutes: None,
            reported_total_hours: None,
        };
    };

    let category = match categories.get(&record.employee_id) {
        Some(c) => c.clone(),
        None => {
            let fetched = sqlx::query_scalar::<_, String>(
                "SELECT category FROM employees WHERE id = ?",
            )
            .bind(record.employee_id)
            .fetch_optional(pool)
            .await
            .ok()
            .flatten()
            .unwrap_or_default();
            categories.insert(record.employee_id, fetched.clone());
            fetched
        }
    };

    let shifts = shift_cache::shifts_for_category(pool, &category).await;
    let Some(matched) = detect_shift_for_time(&shifts, check_in) else {
        return AttendanceReportRow {
            record,
            regular_hours: None,
            early_checkout_minutes: None,
            reported_total_hours: None,
        };
    };

    let (shift_start, shift_end) = shift_bounds(matched.shift, check_in.date());
    let manual_ot = record.ot_manual.then_some(record.ot_hours);
    let auto_ot = if record.ot_manual { 0.0 } else { record.ot_hours };
    let report = derive_report_hours(check_in, check_out, shift_start, shift_end, manual_ot, auto_ot);

    AttendanceReportRow {
        record,
        regular_hours: Some(report.regular_hours),
        early_checkout_minutes: Some(report.early_checkout_minutes),
        reported_total_hours: Some(report.total_hours),
    }
}

/// Administrative edit
#[utoipa::path(
    put,
    path = "/api/v1/attendance/{attendance_id}",
    params(("attendance_id", Path, description = "Attendance record ID")),
    request_body = UpdateAttendance,
    responses(
        (status = 200, description = "Attendance updated"),
        (status = 404, description = "Attendance record not found"),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn update_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    body: web::Json<UpdateAttendance>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let attendance_id = path.into_inner();
    let now = Utc::now().naive_utc();

    let record = sqlx::query_as::<_, Attendance>("SELECT * FROM attendance WHERE id = ?")
        .bind(attendance_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, attendance_id, "Failed to fetch attendance record");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let Some(record) = record else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Attendance record not found"
        })));
    };

    let check_in = body.check_in.or(record.check_in);
    let check_out = body.check_out.or(record.check_out);

    // Manual OT from this edit, or one set earlier: both outrank auto.
    let manual_ot = body.ot_hours.or(record.ot_manual.then_some(record.ot_hours));

    let (delay, extra, total, ot, ot_manual) = match (check_in, check_out) {
        (Some(ci), Some(co)) => {
            let category = sqlx::query_scalar::<_, String>(
                "SELECT category FROM employees WHERE id = ?",
            )
            .bind(record.employee_id)
            .fetch_optional(pool.get_ref())
            .await
            .ok()
            .flatten()
            .unwrap_or_default();

            let shifts = shift_cache::shifts_for_category(pool.get_ref(), &category).await;
            let metrics = compute_metrics(ci, co, &shifts, false, config.min_ot_minutes);

            match manual_ot {
                Some(ot) => (
                    metrics.delay_minutes,
                    metrics.extra_minutes,
                    round2(metrics.total_hours + ot),
                    ot,
                    true,
                ),
                None => (
                    metrics.delay_minutes,
                    metrics.extra_minutes,
                    metrics.total_hours,
                    metrics.ot_hours,
                    false,
                ),
            }
        }
        // open or absence row: carry the override but no recomputation
        _ => (
            record.delay_minutes,
            record.extra_minutes,
            record.total_hours,
            manual_ot.unwrap_or(record.ot_hours),
            manual_ot.is_some() || record.ot_manual,
        ),
    };

    let remark = body.remark.clone().or(record.remark);

    sqlx::query(
        r#"
        UPDATE attendance
        SET check_in = ?, check_out = ?, delay_minutes = ?, extra_minutes = ?,
            total_hours = ?, ot_hours = ?, ot_manual = ?, remark = ?,
            is_edited = TRUE, edited_at = ?
        WHERE id = ?
        "#,
    )
    .bind(check_in)
    .bind(check_out)
    .bind(delay)
    .bind(extra)
    .bind(total)
    .bind(ot)
    .bind(ot_manual)
    .bind(remark)
    .bind(now)
    .bind(attendance_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, attendance_id, "Attendance update failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Attendance updated successfully"
    })))
}

/// Administrative delete
#[utoipa::path(
    delete,
    path = "/api/v1/attendance/{attendance_id}",
    params(("attendance_id", Path, description = "Attendance record ID")),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Attendance record not found"),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn delete_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let attendance_id = path.into_inner();

    let result = sqlx::query("DELETE FROM attendance WHERE id = ?")
        .bind(attendance_id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(res) => {
            if res.rows_affected() == 0 {
                return Ok(HttpResponse::NotFound().json(json!({
                    "message": "Attendance record not found"
                })));
            }

            Ok(HttpResponse::Ok().json(json!({
                "message": "Successfully deleted"
            })))
        }

        Err(e) => {
            error!(error = %e, attendance_id, "Failed to delete attendance record");

            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}
