use crate::{
    auth::auth::AuthUser,
    model::shift::Shift,
    utils::db_utils::{build_update_sql, execute_update},
    utils::shift_cache,
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateShift {
    #[schema(example = "Morning")]
    pub name: String,
    #[schema(example = "production")]
    pub category: String,
    /// "HH:MM", "HH:MM:SS" or "hh:mm AM/PM"
    #[schema(example = "09:00")]
    pub start_time: String,
    /// end before start = crosses midnight
    #[schema(example = "17:00")]
    pub end_time: String,
    #[schema(example = 15, nullable = true)]
    pub grace_before_min: Option<i64>,
    #[schema(example = 30, nullable = true)]
    pub grace_after_min: Option<i64>,
    #[schema(example = 3, nullable = true)]
    pub presence_time_sec: Option<i64>,
    #[schema(example = 3, nullable = true)]
    pub presence_count: Option<i64>,
    #[schema(example = 10, nullable = true)]
    pub presence_window_sec: Option<i64>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ShiftQuery {
    /// Filter by employee category
    pub category: Option<String>,
}

/// Create Shift
#[utoipa::path(
    post,
    path = "/api/v1/shifts",
    request_body = CreateShift,
    responses(
        (status = 200, description = "Shift created successfully"),
        (status = 400, description = "Invalid shift definition"),
        (status = 401),
        (status = 403),
        (status = 500)
    ),
    security(("bearer_auth" = [])),
    tag = "Shift"
)]
pub async fn create_shift(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateShift>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    if payload.name.trim().is_empty() || payload.category.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Shift name and category are required"
        })));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO shifts
        (name, category, start_time, end_time, grace_before_min, grace_after_min,
         presence_time_sec, presence_count, presence_window_sec)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.category.trim())
    .bind(payload.start_time.trim())
    .bind(payload.end_time.trim())
    .bind(payload.grace_before_min)
    .bind(payload.grace_after_min)
    .bind(payload.presence_time_sec)
    .bind(payload.presence_count)
    .bind(payload.presence_window_sec)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => {
            shift_cache::invalidate(&payload.category).await;

            Ok(HttpResponse::Ok().json(json!({
                "message": "Shift created successfully"
            })))
        }
        Err(e) => {
            error!(error = %e, "Failed to create shift");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}

/// List Shifts
#[utoipa::path(
    get,
    path = "/api/v1/shifts",
    params(ShiftQuery),
    responses(
        (status = 200, description = "Shift list", body = [Shift])
    ),
    security(("bearer_auth" = [])),
    tag = "Shift"
)]
pub async fn list_shifts(
    pool: web::Data<MySqlPool>,
    query: web::Query<ShiftQuery>,
) -> actix_web::Result<impl Responder> {
    let shifts = match &query.category {
        // catalog order: start time ascending, same as the engine sees it
        Some(category) => {
            (*shift_cache::shifts_for_category(pool.get_ref(), category).await).clone()
        }
        None => sqlx::query_as::<_, Shift>("SELECT * FROM shifts ORDER BY category, id")
            .fetch_all(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch shifts");
                ErrorInternalServerError("Database error")
            })?,
    };

    Ok(HttpResponse::Ok().json(shifts))
}

/// Get Shift by ID
#[utoipa::path(
    get,
    path = "/api/v1/shifts/{shift_id}",
    params(("shift_id", Path, description = "Shift ID")),
    responses(
        (status = 200, description = "Shift found", body = Shift),
        (status = 404, description = "Shift not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Shift"
)]
pub async fn get_shift(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let shift_id = path.into_inner();

    let shift = sqlx::query_as::<_, Shift>("SELECT * FROM shifts WHERE id = ?")
        .bind(shift_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, shift_id, "Failed to fetch shift");
            ErrorInternalServerError("Internal Server Error")
        })?;

    match shift {
        Some(shift) => Ok(HttpResponse::Ok().json(shift)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Shift not found"
        }))),
    }
}

/// Update Shift
#[utoipa::path(
    put,
    path = "/api/v1/shifts/{shift_id}",
    params(("shift_id", Path, description = "Shift ID")),
    responses(
        (status = 200, description = "Shift updated successfully"),
        (status = 404, description = "Shift not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Shift"
)]
pub async fn update_shift(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<i64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let shift_id = path.into_inner();

    let update = build_update_sql("shifts", &body, "id", shift_id)?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().body("Shift not found"));
    }

    // the category may have changed; flush everything rather than track both
    shift_cache::invalidate_all();

    Ok(HttpResponse::Ok().body("Shift updated successfully"))
}

/// Delete Shift
#[utoipa::path(
    delete,
    path = "/api/v1/shifts/{shift_id}",
    params(("shift_id", Path, description = "Shift ID")),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Shift not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Shift"
)]
pub async fn delete_shift(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let shift_id = path.into_inner();

    let result = sqlx::query("DELETE FROM shifts WHERE id = ?")
        .bind(shift_id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(res) => {
            if res.rows_affected() == 0 {
                return Ok(HttpResponse::NotFound().json(json!({
                    "message": "Shift not found"
                })));
            }

            shift_cache::invalidate_all();

            Ok(HttpResponse::Ok().json(json!({
                "message": "Successfully deleted"
            })))
        }

        Err(e) => {
            error!(error = %e, shift_id, "Failed to delete shift");

            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}
