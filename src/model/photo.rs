use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Enrolled baseline image for face comparison. At most one row per
/// (user, company) carries `is_primary = true`.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReferencePhoto {
    pub id: u64,
    pub user_id: u64,
    pub company_id: u64,
    pub photo: String,
    pub is_primary: bool,
    pub created_at: Option<DateTime<Utc>>,
}
