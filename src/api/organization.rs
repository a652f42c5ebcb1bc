use crate::{
    auth::auth::AuthUser,
    model::organization::Organization,
    utils::db_utils::{build_update_sql, execute_update},
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateOrganization {
    #[schema(example = "Acme Garments Ltd")]
    pub name: String,
    #[schema(example = "Plot 12, Export Processing Zone", nullable = true)]
    pub address: Option<String>,
    #[schema(example = "hr@acme.example", nullable = true)]
    pub contact_email: Option<String>,
}

/// Create Organization
#[utoipa::path(
    post,
    path = "/api/v1/organizations",
    request_body = CreateOrganization,
    responses(
        (status = 200, description = "Organization created successfully"),
        (status = 401),
        (status = 403),
        (status = 500)
    ),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn create_organization(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateOrganization>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let result = sqlx::query(
        r#"
        INSERT INTO organizations (name, address, contact_email)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(payload.name.trim())
    .bind(&payload.address)
    .bind(&payload.contact_email)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => Ok(HttpResponse::Ok().json(json!({
            "message": "Organization created successfully"
        }))),
        Err(e) => {
            error!(error = %e, "Failed to create organization");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}

/// List Organizations
#[utoipa::path(
    get,
    path = "/api/v1/organizations",
    responses(
        (status = 200, description = "Organization list", body = [Organization])
    ),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn list_organizations(
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let organizations =
        sqlx::query_as::<_, Organization>("SELECT * FROM organizations ORDER BY id")
            .fetch_all(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch organizations");
                ErrorInternalServerError("Database error")
            })?;

    Ok(HttpResponse::Ok().json(organizations))
}

/// Get Organization by ID
#[utoipa::path(
    get,
    path = "/api/v1/organizations/{organization_id}",
    params(("organization_id", Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Organization found", body = Organization),
        (status = 404, description = "Organization not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn get_organization(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let organization_id = path.into_inner();

    let organization =
        sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = ?")
            .bind(organization_id)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, organization_id, "Failed to fetch organization");
                ErrorInternalServerError("Internal Server Error")
            })?;

    match organization {
        Some(org) => Ok(HttpResponse::Ok().json(org)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Organization not found"
        }))),
    }
}

/// Update Organization
#[utoipa::path(
    put,
    path = "/api/v1/organizations/{organization_id}",
    params(("organization_id", Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Organization updated successfully"),
        (status = 404, description = "Organization not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn update_organization(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<i64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let organization_id = path.into_inner();

    let update = build_update_sql("organizations", &body, "id", organization_id)?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().body("Organization not found"));
    }

    Ok(HttpResponse::Ok().body("Organization updated successfully"))
}

/// Delete Organization
#[utoipa::path(
    delete,
    path = "/api/v1/organizations/{organization_id}",
    params(("organization_id", Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Organization not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn delete_organization(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let organization_id = path.into_inner();

    let result = sqlx::query("DELETE FROM organizations WHERE id = ?")
        .bind(organization_id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(res) => {
            if res.rows_affected() == 0 {
                return Ok(HttpResponse::NotFound().json(json!({
                    "message": "Organization not found"
                })));
            }

            Ok(HttpResponse::Ok().json(json!({
                "message": "Successfully deleted"
            })))
        }

        Err(e) => {
            error!(error = %e, organization_id, "Failed to delete organization");

            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}
