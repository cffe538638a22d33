use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    OnLeave,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::OnLeave => "on_leave",
        }
    }
}

/// One attendance row per (user, company, calendar date).
///
/// `hours_worked` is derived from check-in/check-out, never accepted as
/// input. `check_out_time`, when present, is >= `check_in_time`.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "user_id": 42,
    "company_id": 1,
    "date": "2026-08-06",
    "check_in_time": "2026-08-06T09:00:00Z",
    "check_in_lat": 40.0,
    "check_in_lng": -73.0,
    "check_out_time": "2026-08-06T17:30:00Z",
    "status": "present",
    "hours_worked": 8.5
}))]
pub struct AttendanceRecord {
    pub id: u64,
    pub user_id: u64,
    pub company_id: u64,

    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_in_lat: Option<f64>,
    pub check_in_lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in_photo: Option<String>,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out_time: Option<DateTime<Utc>>,
    pub check_out_lat: Option<f64>,
    pub check_out_lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_out_photo: Option<String>,

    #[schema(example = "present")]
    pub status: String,

    #[schema(example = 8.5)]
    pub hours_worked: Option<f64>,
}
