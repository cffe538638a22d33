use crate::auth::auth::AuthUser;
use crate::engine::error::AttendanceError;
use crate::model::department::Department;
use crate::model::role::Role;
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateDepartment {
    #[schema(example = 1)]
    pub company_id: u64,
    #[schema(example = "Engineering")]
    pub name: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/department",
    request_body = CreateDepartment,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 400), (status = 401), (status = 403),
        (status = 409, description = "Duplicate name")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn create_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateDepartment>,
) -> actix_web::Result<impl Responder> {
    auth.require_role(pool.get_ref(), payload.company_id, &[Role::Admin])
        .await?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AttendanceError::InvalidInput("name must not be empty".into()).into());
    }

    let result = sqlx::query("INSERT INTO departments (company_id, name) VALUES (?, ?)")
        .bind(payload.company_id)
        .bind(name)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(res) => Ok(HttpResponse::Created().json(Department {
            id: res.last_insert_id(),
            company_id: payload.company_id,
            name: name.to_string(),
        })),
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict()
                        .json(json!({ "message": "Department already exists" })));
                }
            }
            error!(error = %e, "Failed to create department");
            Err(ErrorInternalServerError("Internal Server Error"))
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct DepartmentQuery {
    #[schema(example = 1)]
    pub company_id: u64,
}

#[utoipa::path(
    get,
    path = "/api/v1/department",
    params(DepartmentQuery),
    responses(
        (status = 200, description = "Departments", body = [Department]),
        (status = 401)
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn list_departments(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<DepartmentQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_member(pool.get_ref(), query.company_id).await?;

    let departments = sqlx::query_as::<_, Department>(
        "SELECT id, company_id, name FROM departments WHERE company_id = ? ORDER BY name",
    )
    .bind(query.company_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch departments");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(departments))
}

#[utoipa::path(
    delete,
    path = "/api/v1/department/{department_id}",
    params(("department_id", Path, description = "Department ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "Department not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn delete_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let department_id = path.into_inner();

    let company: Option<(u64,)> =
        sqlx::query_as("SELECT company_id FROM departments WHERE id = ?")
            .bind(department_id)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, department_id, "Failed to fetch department");
                ErrorInternalServerError("Internal Server Error")
            })?;

    let Some((company_id,)) = company else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Department not found" })));
    };
    auth.require_role(pool.get_ref(), company_id, &[Role::Admin])
        .await?;

    sqlx::query("DELETE FROM departments WHERE id = ?")
        .bind(department_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, department_id, "Failed to delete department");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Department deleted" })))
}
