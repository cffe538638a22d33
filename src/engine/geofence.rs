use crate::engine::error::{AttendanceError, Result};
use crate::model::geofence::Geofence;
use sqlx::MySqlPool;
use tracing::debug;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two lat/lng points (haversine).
pub fn haversine_distance_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Outcome of checking a point against a company's registered sites.
///
/// Distances stay in double-precision meters; rounding to whole meters
/// happens only when building user-facing messages.
#[derive(Debug, Clone, PartialEq)]
pub struct GeofenceCheck {
    pub within_boundary: bool,
    /// Meters to the nearest site; `None` when no geofence is configured.
    pub distance_m: Option<f64>,
    pub nearest_name: Option<String>,
    pub nearest_radius_m: Option<f64>,
}

impl GeofenceCheck {
    pub fn rounded_distance_m(&self) -> Option<i64> {
        self.distance_m.map(|d| d.round() as i64)
    }

    pub fn message(&self) -> String {
        match (self.within_boundary, self.rounded_distance_m()) {
            (_, None) => "No geofence configured".to_string(),
            (true, Some(_)) => "Within geofence".to_string(),
            (false, Some(d)) => format!(
                "{}m away from {}",
                d,
                self.nearest_name.as_deref().unwrap_or("nearest site")
            ),
        }
    }

    /// The error a non-matching check escalates to.
    pub fn violation(&self) -> AttendanceError {
        AttendanceError::GeofenceViolation {
            distance_m: self.rounded_distance_m().unwrap_or(0),
            nearest: self
                .nearest_name
                .clone()
                .unwrap_or_else(|| "nearest site".to_string()),
        }
    }
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(AttendanceError::InvalidInput(format!(
            "latitude out of range: {latitude}"
        )));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(AttendanceError::InvalidInput(format!(
            "longitude out of range: {longitude}"
        )));
    }
    Ok(())
}

/// Check a point against every site. No configured boundary means the check
/// is vacuously satisfied. `nearest_*` always reports the globally nearest
/// site, whether or not the point matched.
pub fn evaluate(sites: &[Geofence], latitude: f64, longitude: f64) -> GeofenceCheck {
    let mut within = false;
    let mut nearest: Option<(&Geofence, f64)> = None;

    for site in sites {
        let distance = haversine_distance_m(latitude, longitude, site.latitude, site.longitude);
        if distance <= site.radius_m {
            within = true;
        }
        match nearest {
            Some((_, best)) if best <= distance => {}
            _ => nearest = Some((site, distance)),
        }
    }

    match nearest {
        None => GeofenceCheck {
            within_boundary: true,
            distance_m: None,
            nearest_name: None,
            nearest_radius_m: None,
        },
        Some((site, distance)) => GeofenceCheck {
            within_boundary: within,
            distance_m: Some(distance),
            nearest_name: Some(site.name.clone()),
            nearest_radius_m: Some(site.radius_m),
        },
    }
}

/// Fetch the company's geofences and evaluate the point against them.
/// Storage failures surface as `Upstream` and are not retried here.
pub async fn validate_location(
    pool: &MySqlPool,
    company_id: u64,
    latitude: f64,
    longitude: f64,
) -> Result<GeofenceCheck> {
    validate_coordinates(latitude, longitude)?;

    let sites = sqlx::query_as::<_, Geofence>(
        r#"
        SELECT id, company_id, name, latitude, longitude, radius_m
        FROM geofences
        WHERE company_id = ?
        "#,
    )
    .bind(company_id)
    .fetch_all(pool)
    .await?;

    let check = evaluate(&sites, latitude, longitude);
    debug!(
        company_id,
        within = check.within_boundary,
        distance_m = ?check.rounded_distance_m(),
        nearest = ?check.nearest_name,
        "Geofence validation"
    );
    Ok(check)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(name: &str, lat: f64, lng: f64, radius_m: f64) -> Geofence {
        Geofence {
            id: 1,
            company_id: 1,
            name: name.to_string(),
            latitude: lat,
            longitude: lng,
            radius_m,
        }
    }

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(haversine_distance_m(40.0, -73.0, 40.0, -73.0), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let ab = haversine_distance_m(40.0, -73.0, 51.5, -0.12);
        let ba = haversine_distance_m(51.5, -0.12, 40.0, -73.0);
        assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = haversine_distance_m(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_195.0).abs() < 100.0, "got {d}");
    }

    #[test]
    fn no_sites_is_vacuously_within() {
        let check = evaluate(&[], 89.9, 179.9);
        assert!(check.within_boundary);
        assert_eq!(check.distance_m, None);
        assert_eq!(check.nearest_name, None);
        assert_eq!(check.message(), "No geofence configured");
    }

    #[test]
    fn point_at_center_is_within() {
        let check = evaluate(&[site("HQ", 40.0, -73.0, 100.0)], 40.0, -73.0);
        assert!(check.within_boundary);
        assert_eq!(check.rounded_distance_m(), Some(0));
        assert_eq!(check.nearest_name.as_deref(), Some("HQ"));
    }

    #[test]
    fn point_500m_out_violates_a_100m_fence() {
        // ~500m north of the HQ center: 500 / 111195 degrees of latitude.
        let lat = 40.0 + 500.0 / 111_195.0;
        let check = evaluate(&[site("HQ", 40.0, -73.0, 100.0)], lat, -73.0);
        assert!(!check.within_boundary);
        let d = check.distance_m.unwrap();
        assert!((d - 500.0).abs() < 1.0, "got {d}");
        match check.violation() {
            AttendanceError::GeofenceViolation { distance_m, nearest } => {
                assert_eq!(distance_m, 500);
                assert_eq!(nearest, "HQ");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn any_matching_site_is_enough() {
        let sites = [
            site("Far", 0.0, 0.0, 10.0),
            site("Near", 40.0, -73.0, 250.0),
        ];
        let check = evaluate(&sites, 40.001, -73.0);
        assert!(check.within_boundary);
        assert_eq!(check.nearest_name.as_deref(), Some("Near"));
    }

    #[test]
    fn nearest_site_reported_on_miss() {
        let sites = [
            site("A", 40.0, -73.0, 1.0),
            site("B", 40.01, -73.0, 1.0),
        ];
        let check = evaluate(&sites, 40.009, -73.0);
        assert!(!check.within_boundary);
        assert_eq!(check.nearest_name.as_deref(), Some("B"));
        assert_eq!(check.nearest_radius_m, Some(1.0));
    }

    #[test]
    fn boundary_is_inclusive() {
        let radius = haversine_distance_m(40.0, -73.0, 40.001, -73.0);
        let check = evaluate(&[site("Edge", 40.0, -73.0, radius)], 40.001, -73.0);
        assert!(check.within_boundary);
    }

    #[test]
    fn rejects_malformed_coordinates() {
        assert!(validate_coordinates(91.0, 0.0).is_err());
        assert!(validate_coordinates(-91.0, 0.0).is_err());
        assert!(validate_coordinates(0.0, 181.0).is_err());
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
        assert!(validate_coordinates(0.0, f64::INFINITY).is_err());
        assert!(validate_coordinates(90.0, -180.0).is_ok());
    }
}
