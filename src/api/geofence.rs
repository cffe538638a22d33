use crate::auth::auth::AuthUser;
use crate::engine::error::AttendanceError;
use crate::engine::geofence::validate_coordinates;
use crate::model::geofence::Geofence;
use crate::model::role::Role;
use crate::utils::db_utils::{build_update_sql, execute_update};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

const UPDATABLE_COLUMNS: &[&str] = &["name", "latitude", "longitude", "radius_m"];

#[derive(Deserialize, ToSchema)]
pub struct CreateGeofence {
    #[schema(example = 1)]
    pub company_id: u64,
    #[schema(example = "HQ")]
    pub name: String,
    #[schema(example = 40.0)]
    pub latitude: f64,
    #[schema(example = -73.0)]
    pub longitude: f64,
    #[schema(example = 100.0)]
    pub radius_m: f64,
}

/// Register a site boundary (admin only)
#[utoipa::path(
    post,
    path = "/api/v1/geofence",
    request_body = CreateGeofence,
    responses(
        (status = 201, description = "Geofence created", body = Geofence),
        (status = 400, description = "Invalid coordinates or radius"),
        (status = 401), (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Geofence"
)]
pub async fn create_geofence(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateGeofence>,
) -> actix_web::Result<impl Responder> {
    auth.require_role(pool.get_ref(), payload.company_id, &[Role::Admin])
        .await?;

    validate_coordinates(payload.latitude, payload.longitude)?;
    if !(payload.radius_m > 0.0) || !payload.radius_m.is_finite() {
        return Err(
            AttendanceError::InvalidInput(format!("radius must be > 0, got {}", payload.radius_m))
                .into(),
        );
    }
    if payload.name.trim().is_empty() {
        return Err(AttendanceError::InvalidInput("name must not be empty".into()).into());
    }

    let result = sqlx::query(
        r#"
        INSERT INTO geofences (company_id, name, latitude, longitude, radius_m)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.company_id)
    .bind(payload.name.trim())
    .bind(payload.latitude)
    .bind(payload.longitude)
    .bind(payload.radius_m)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to create geofence");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let geofence = Geofence {
        id: result.last_insert_id(),
        company_id: payload.company_id,
        name: payload.name.trim().to_string(),
        latitude: payload.latitude,
        longitude: payload.longitude,
        radius_m: payload.radius_m,
    };

    Ok(HttpResponse::Created().json(geofence))
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct GeofenceQuery {
    #[schema(example = 1)]
    pub company_id: u64,
}

/// List the company's site boundaries
#[utoipa::path(
    get,
    path = "/api/v1/geofence",
    params(GeofenceQuery),
    responses(
        (status = 200, description = "Geofences", body = [Geofence]),
        (status = 401)
    ),
    security(("bearer_auth" = [])),
    tag = "Geofence"
)]
pub async fn list_geofences(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<GeofenceQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_member(pool.get_ref(), query.company_id).await?;

    let geofences = sqlx::query_as::<_, Geofence>(
        r#"
        SELECT id, company_id, name, latitude, longitude, radius_m
        FROM geofences
        WHERE company_id = ?
        ORDER BY name
        "#,
    )
    .bind(query.company_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch geofences");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(geofences))
}

async fn fetch_company_of(pool: &MySqlPool, geofence_id: u64) -> actix_web::Result<Option<u64>> {
    let row: Option<(u64,)> = sqlx::query_as("SELECT company_id FROM geofences WHERE id = ?")
        .bind(geofence_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            error!(error = %e, geofence_id, "Failed to fetch geofence");
            ErrorInternalServerError("Internal Server Error")
        })?;
    Ok(row.map(|(id,)| id))
}

/// Partially update a boundary (admin only)
#[utoipa::path(
    put,
    path = "/api/v1/geofence/{geofence_id}",
    params(("geofence_id", Path, description = "Geofence ID")),
    responses(
        (status = 200, description = "Geofence updated"),
        (status = 400), (status = 404, description = "Geofence not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Geofence"
)]
pub async fn update_geofence(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let geofence_id = path.into_inner();

    let Some(company_id) = fetch_company_of(pool.get_ref(), geofence_id).await? else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Geofence not found" })));
    };
    auth.require_role(pool.get_ref(), company_id, &[Role::Admin])
        .await?;

    if let Some(radius) = body.get("radius_m").and_then(Value::as_f64) {
        if !(radius > 0.0) || !radius.is_finite() {
            return Err(
                AttendanceError::InvalidInput(format!("radius must be > 0, got {radius}")).into(),
            );
        }
    }
    if let (Some(lat), Some(lng)) = (
        body.get("latitude").and_then(Value::as_f64),
        body.get("longitude").and_then(Value::as_f64),
    ) {
        validate_coordinates(lat, lng)?;
    }

    let update = build_update_sql("geofences", &body, UPDATABLE_COLUMNS, "id", geofence_id)?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(ErrorInternalServerError)?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Geofence not found" })));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Geofence updated" })))
}

/// Delete a boundary (admin only)
#[utoipa::path(
    delete,
    path = "/api/v1/geofence/{geofence_id}",
    params(("geofence_id", Path, description = "Geofence ID")),
    responses(
        (status = 200, description = "Geofence deleted"),
        (status = 404, description = "Geofence not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Geofence"
)]
pub async fn delete_geofence(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let geofence_id = path.into_inner();

    let Some(company_id) = fetch_company_of(pool.get_ref(), geofence_id).await? else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Geofence not found" })));
    };
    auth.require_role(pool.get_ref(), company_id, &[Role::Admin])
        .await?;

    let result = sqlx::query("DELETE FROM geofences WHERE id = ?")
        .bind(geofence_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, geofence_id, "Failed to delete geofence");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Geofence not found" })));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Geofence deleted" })))
}
