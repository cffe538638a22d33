use crate::auth::auth::AuthUser;
use crate::engine::error::AttendanceError;
use crate::model::payroll::Payroll;
use crate::model::role::Role;
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreatePayroll {
    #[schema(example = 1)]
    pub company_id: u64,
    #[schema(example = 42)]
    pub user_id: u64,

    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub month: NaiveDate,

    #[schema(example = 50000.0)]
    pub base_salary: f64,

    #[schema(example = 5000.0)]
    pub bonus: f64,

    #[schema(example = 2000.0)]
    pub deductions: f64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PayrollQuery {
    #[schema(example = 1)]
    pub company_id: u64,
    pub user_id: Option<u64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedPayrollResponse {
    pub data: Vec<Payroll>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[utoipa::path(
    post,
    path = "/api/v1/payroll",
    request_body = CreatePayroll,
    responses(
        (status = 201, description = "Payroll created"),
        (status = 400), (status = 401), (status = 403),
        (status = 409, description = "Month already recorded for this member")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn create_payroll(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreatePayroll>,
) -> actix_web::Result<impl Responder> {
    auth.require_role(pool.get_ref(), payload.company_id, &[Role::Admin])
        .await?;

    // The target must be a member of the same company.
    let member: Option<(u64,)> =
        sqlx::query_as("SELECT id FROM user_roles WHERE user_id = ? AND company_id = ?")
            .bind(payload.user_id)
            .bind(payload.company_id)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(AttendanceError::from)?;
    if member.is_none() {
        return Err(AttendanceError::InvalidInput(
            "user is not a member of this company".into(),
        )
        .into());
    }

    let net_salary = payload.base_salary + payload.bonus - payload.deductions;

    let result = sqlx::query(
        r#"
        INSERT INTO payroll
        (user_id, company_id, month, base_salary, bonus, deductions, net_salary)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.user_id)
    .bind(payload.company_id)
    .bind(payload.month)
    .bind(payload.base_salary)
    .bind(payload.bonus)
    .bind(payload.deductions)
    .bind(net_salary)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => Ok(HttpResponse::Created().json(json!({
            "message": "Payroll created successfully"
        }))),
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "message": "Payroll already recorded for this month"
                    })));
                }
            }
            error!(error = %e, "Failed to create payroll");
            Err(ErrorInternalServerError("Internal Server Error"))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/payroll",
    params(PayrollQuery),
    responses(
        (status = 200, body = PaginatedPayrollResponse),
        (status = 401), (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_payrolls(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PayrollQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_role(pool.get_ref(), query.company_id, &[Role::Admin, Role::Hr])
        .await?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE company_id = ?");
    if query.user_id.is_some() {
        where_sql.push_str(" AND user_id = ?");
    }

    let count_sql = format!("SELECT COUNT(*) FROM payroll{}", where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql).bind(query.company_id);
    if let Some(user_id) = query.user_id {
        count_q = count_q.bind(user_id);
    }
    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count payrolls");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        r#"
        SELECT id, user_id, company_id, month, base_salary, bonus, deductions, net_salary
        FROM payroll
        {}
        ORDER BY month DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );
    let mut data_q = sqlx::query_as::<_, Payroll>(&data_sql).bind(query.company_id);
    if let Some(user_id) = query.user_id {
        data_q = data_q.bind(user_id);
    }

    let data = data_q
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch payroll list");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(PaginatedPayrollResponse {
        data,
        page,
        per_page,
        total,
    }))
}
