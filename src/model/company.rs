use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Company {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Acme Corp")]
    pub name: String,

    #[schema(example = 42)]
    pub admin_id: u64,

    #[schema(example = "2026-01-01T00:00:00Z", value_type = String, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct InviteCode {
    pub id: u64,
    pub company_id: u64,

    #[schema(example = "K7Q2M9BD")]
    pub code: String,

    #[schema(example = "employee")]
    pub role: String,

    pub max_uses: u32,
    pub current_uses: u32,
    pub created_by: u64,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub expires_at: Option<DateTime<Utc>>,
}
