use crate::auth::auth::AuthUser;
use crate::engine::error::AttendanceError;
use crate::model::role::Role;
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct ReportRequest {
    #[schema(example = 1)]
    pub company_id: u64,
    /// "attendance" or "leave"
    #[schema(example = "attendance")]
    pub report_type: String,
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-31", value_type = String, format = "date")]
    pub end_date: NaiveDate,
    /// Restrict to one member
    pub user_id: Option<u64>,
}

#[derive(Debug, PartialEq, Serialize, ToSchema)]
pub struct AttendanceStats {
    pub total_days: usize,
    pub present_days: usize,
    pub total_hours: f64,
    pub average_hours_per_day: f64,
    /// Percent of rows with status present, rounded to whole percent.
    pub attendance_rate: i64,
}

#[derive(Debug, PartialEq, Serialize, ToSchema)]
pub struct LeaveStats {
    pub total_requests: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn attendance_stats(rows: &[(String, Option<f64>)]) -> AttendanceStats {
    let total_days = rows.len();
    let present_days = rows.iter().filter(|(status, _)| status == "present").count();
    let total_hours: f64 = rows.iter().filter_map(|(_, h)| *h).sum();
    let average = if total_days > 0 {
        total_hours / total_days as f64
    } else {
        0.0
    };
    let rate = if total_days > 0 {
        (present_days as f64 / total_days as f64 * 100.0).round() as i64
    } else {
        0
    };

    AttendanceStats {
        total_days,
        present_days,
        total_hours: round2(total_hours),
        average_hours_per_day: round2(average),
        attendance_rate: rate,
    }
}

pub fn leave_stats(statuses: &[String]) -> LeaveStats {
    let count = |s: &str| statuses.iter().filter(|v| v == &s).count();
    LeaveStats {
        total_requests: statuses.len(),
        pending: count("pending"),
        approved: count("approved"),
        rejected: count("rejected"),
    }
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct ReportAttendanceRow {
    pub user_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: String,
    pub hours_worked: Option<f64>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct ReportLeaveRow {
    pub user_id: u64,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub leave_type: String,
    pub status: String,
}

/// Aggregate report over a date range (admin/HR)
#[utoipa::path(
    post,
    path = "/api/v1/report",
    request_body = ReportRequest,
    responses(
        (status = 200, description = "Report with records and statistics"),
        (status = 400, description = "Unknown report type or bad range"),
        (status = 401), (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Report"
)]
pub async fn generate_report(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ReportRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_role(pool.get_ref(), payload.company_id, &[Role::Admin, Role::Hr])
        .await?;

    if payload.start_date > payload.end_date {
        return Err(
            AttendanceError::InvalidInput("start_date cannot be after end_date".into()).into(),
        );
    }

    match payload.report_type.as_str() {
        "attendance" => attendance_report(pool.get_ref(), &payload).await,
        "leave" => leave_report(pool.get_ref(), &payload).await,
        other => {
            Err(AttendanceError::InvalidInput(format!("unknown report type: {other}")).into())
        }
    }
}

async fn attendance_report(
    pool: &MySqlPool,
    req: &ReportRequest,
) -> actix_web::Result<HttpResponse> {
    let mut sql = String::from(
        "SELECT user_id, date, status, hours_worked FROM attendance \
         WHERE company_id = ? AND date >= ? AND date <= ?",
    );
    if req.user_id.is_some() {
        sql.push_str(" AND user_id = ?");
    }
    sql.push_str(" ORDER BY date");

    let mut q = sqlx::query_as::<_, ReportAttendanceRow>(&sql)
        .bind(req.company_id)
        .bind(req.start_date)
        .bind(req.end_date);
    if let Some(user_id) = req.user_id {
        q = q.bind(user_id);
    }

    let records = q.fetch_all(pool).await.map_err(|e| {
        error!(error = %e, "Failed to fetch attendance report rows");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let stats = attendance_stats(
        &records
            .iter()
            .map(|r| (r.status.clone(), r.hours_worked))
            .collect::<Vec<_>>(),
    );

    Ok(HttpResponse::Ok().json(json!({
        "type": "attendance",
        "records": records,
        "statistics": stats,
    })))
}

async fn leave_report(pool: &MySqlPool, req: &ReportRequest) -> actix_web::Result<HttpResponse> {
    let mut sql = String::from(
        "SELECT user_id, start_date, end_date, leave_type, status FROM leave_requests \
         WHERE company_id = ? AND start_date >= ? AND start_date <= ?",
    );
    if req.user_id.is_some() {
        sql.push_str(" AND user_id = ?");
    }
    sql.push_str(" ORDER BY start_date");

    let mut q = sqlx::query_as::<_, ReportLeaveRow>(&sql)
        .bind(req.company_id)
        .bind(req.start_date)
        .bind(req.end_date);
    if let Some(user_id) = req.user_id {
        q = q.bind(user_id);
    }

    let records = q.fetch_all(pool).await.map_err(|e| {
        error!(error = %e, "Failed to fetch leave report rows");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let stats = leave_stats(&records.iter().map(|r| r.status.clone()).collect::<Vec<_>>());

    Ok(HttpResponse::Ok().json(json!({
        "type": "leave",
        "records": records,
        "statistics": stats,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str, hours: Option<f64>) -> (String, Option<f64>) {
        (status.to_string(), hours)
    }

    #[test]
    fn attendance_stats_on_empty_range() {
        let stats = attendance_stats(&[]);
        assert_eq!(stats.total_days, 0);
        assert_eq!(stats.average_hours_per_day, 0.0);
        assert_eq!(stats.attendance_rate, 0);
    }

    #[test]
    fn attendance_stats_counts_and_rounds() {
        let rows = [
            row("present", Some(8.5)),
            row("present", Some(7.25)),
            row("absent", None),
            row("on_leave", None),
        ];
        let stats = attendance_stats(&rows);
        assert_eq!(stats.total_days, 4);
        assert_eq!(stats.present_days, 2);
        assert_eq!(stats.total_hours, 15.75);
        assert_eq!(stats.average_hours_per_day, 3.94);
        assert_eq!(stats.attendance_rate, 50);
    }

    #[test]
    fn leave_stats_counts_by_status() {
        let statuses = vec![
            "pending".to_string(),
            "approved".to_string(),
            "approved".to_string(),
            "rejected".to_string(),
        ];
        let stats = leave_stats(&statuses);
        assert_eq!(stats.total_requests, 4);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.approved, 2);
        assert_eq!(stats.rejected, 1);
    }
}
