use crate::auth::auth::AuthUser;
use crate::engine::face::FaceVerifier;
use crate::engine::geofence::GeofenceCheck;
use crate::engine::orchestrator::{self, CheckRequest};
use crate::model::attendance::AttendanceRecord;
use crate::model::role::Role;
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CheckPayload {
    #[schema(example = 1)]
    pub company_id: u64,
    #[schema(example = 40.0)]
    pub latitude: f64,
    #[schema(example = -73.0)]
    pub longitude: f64,
    /// Captured photo as a data:image/* URL.
    #[schema(example = "data:image/jpeg;base64,/9j/4AAQ...")]
    pub photo_base64: String,
}

impl CheckPayload {
    fn into_request(self) -> CheckRequest {
        CheckRequest {
            company_id: self.company_id,
            latitude: self.latitude,
            longitude: self.longitude,
            photo: self.photo_base64,
        }
    }
}

fn geofence_json(check: &GeofenceCheck) -> serde_json::Value {
    json!({
        "valid": check.within_boundary,
        "distance_m": check.rounded_distance_m(),
        "nearest_geofence": &check.nearest_name,
        "radius_m": check.nearest_radius_m,
        "message": check.message(),
    })
}

/// Geofenced, face-verified check-in.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-in",
    request_body = CheckPayload,
    responses(
        (status = 200, description = "Checked in successfully", body = Object, example = json!({
            "success": true,
            "attendance": {"id": 1, "status": "present"},
            "geofence": {"valid": true, "distance_m": 12, "nearest_geofence": "HQ"},
            "face_verification": {"verified": true, "confidence": 0.94, "enrolled_now": false}
        })),
        (status = 400, description = "Outside geofence, face mismatch, or already checked in"),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Storage or AI gateway failure")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    verifier: web::Data<FaceVerifier>,
    payload: web::Json<CheckPayload>,
) -> actix_web::Result<impl Responder> {
    let request = payload.into_inner().into_request();
    auth.require_member(pool.get_ref(), request.company_id).await?;

    let outcome =
        orchestrator::check_in(pool.get_ref(), verifier.get_ref(), auth.user_id, &request).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "attendance": outcome.attendance,
        "geofence": geofence_json(&outcome.geofence),
        "face_verification": outcome.face,
    })))
}

/// Geofenced check-out; computes hours worked.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-out",
    request_body = CheckPayload,
    responses(
        (status = 200, description = "Checked out successfully"),
        (status = 400, description = "No check-in today, already checked out, or outside geofence"),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Storage failure")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CheckPayload>,
) -> actix_web::Result<impl Responder> {
    let request = payload.into_inner().into_request();
    auth.require_member(pool.get_ref(), request.company_id).await?;

    let outcome = orchestrator::check_out(pool.get_ref(), auth.user_id, &request).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "attendance": outcome.attendance,
        "hours_worked": outcome.hours_worked,
        "geofence": geofence_json(&outcome.geofence),
    })))
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AttendanceQuery {
    #[schema(example = 1)]
    pub company_id: u64,
    /// Filter by user; employees always see only their own rows.
    pub user_id: Option<u64>,
    #[param(value_type = Option<String>, format = "date")]
    #[schema(value_type = Option<String>, format = "date")]
    pub from: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = "date")]
    #[schema(value_type = Option<String>, format = "date")]
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Date(NaiveDate),
}

/// Company attendance listing. Admin/HR see everyone, employees themselves.
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Paginated attendance rows"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceQuery>,
) -> actix_web::Result<impl Responder> {
    let role = auth.require_member(pool.get_ref(), query.company_id).await?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE company_id = ?");
    let mut args: Vec<FilterValue> = vec![FilterValue::U64(query.company_id)];

    // Employees are pinned to their own rows whatever the filter says.
    let user_filter = match role {
        Role::Employee => Some(auth.user_id),
        _ => query.user_id,
    };
    if let Some(user_id) = user_filter {
        where_sql.push_str(" AND user_id = ?");
        args.push(FilterValue::U64(user_id));
    }
    if let Some(from) = query.from {
        where_sql.push_str(" AND date >= ?");
        args.push(FilterValue::Date(from));
    }
    if let Some(to) = query.to {
        where_sql.push_str(" AND date <= ?");
        args.push(FilterValue::Date(to));
    }

    let count_sql = format!("SELECT COUNT(*) FROM attendance{}", where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Date(d) => count_q.bind(*d),
        };
    }
    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count attendance rows");
        ErrorInternalServerError("Internal Server Error")
    })?;

    // Listings never carry photo payloads.
    let data_sql = format!(
        r#"
        SELECT id, user_id, company_id, date,
               check_in_time, check_in_lat, check_in_lng, NULL AS check_in_photo,
               check_out_time, check_out_lat, check_out_lng, NULL AS check_out_photo,
               status, hours_worked
        FROM attendance
        {}
        ORDER BY date DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, AttendanceRecord>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Date(d) => data_q.bind(d),
        };
    }

    let records = data_q
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch attendance rows");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(json!({
        "data": records,
        "page": page,
        "per_page": per_page,
        "total": total,
    })))
}
