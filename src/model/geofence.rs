use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Named circular boundary constraining where attendance actions are valid.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "company_id": 1,
    "name": "HQ",
    "latitude": 40.0,
    "longitude": -73.0,
    "radius_m": 100.0
}))]
pub struct Geofence {
    pub id: u64,
    pub company_id: u64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Radius in meters, always > 0.
    pub radius_m: f64,
}
