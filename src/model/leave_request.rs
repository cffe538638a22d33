use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRequest {
    pub id: u64,
    pub user_id: u64,
    pub company_id: u64,

    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,

    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,

    #[schema(example = "sick")]
    pub leave_type: String,

    #[schema(example = "pending")]
    pub status: String,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}
