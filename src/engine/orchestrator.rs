//! Entry points for the attendance flows.
//!
//! Each flow is an explicit state machine driven to completion in a loop.
//! States own the results of the steps already taken, so a failure in any
//! state drops everything accumulated so far; nothing is persisted until
//! the recording step, and the recorder writes exactly one row. The sole
//! write outside `Recording` is trust-on-first-use enrollment inside the
//! face step, which outlives a later recording failure.

use crate::engine::error::{AttendanceError, Result};
use crate::engine::face::{self, FaceVerification, FaceVerifier};
use crate::engine::geofence::{self, GeofenceCheck};
use crate::engine::recorder;
use crate::model::attendance::AttendanceRecord;
use chrono::Utc;
use sqlx::MySqlPool;
use tracing::info;

/// Client-captured inputs for one check-in/check-out attempt. Identity and
/// tenant are passed explicitly; nothing is read from ambient state.
#[derive(Debug)]
pub struct CheckRequest {
    pub company_id: u64,
    pub latitude: f64,
    pub longitude: f64,
    pub photo: String,
}

impl CheckRequest {
    fn validate(&self) -> Result<()> {
        geofence::validate_coordinates(self.latitude, self.longitude)?;
        face::validate_photo(&self.photo)
    }
}

pub struct CheckInOutcome {
    pub attendance: AttendanceRecord,
    pub geofence: GeofenceCheck,
    pub face: FaceVerification,
}

pub struct CheckOutOutcome {
    pub attendance: AttendanceRecord,
    pub geofence: GeofenceCheck,
    pub hours_worked: f64,
}

enum CheckInState {
    ValidatingGeofence,
    VerifyingFace(GeofenceCheck),
    Recording(GeofenceCheck, FaceVerification),
    Done(CheckInOutcome),
}

enum CheckOutState {
    ValidatingGeofence,
    Recording(GeofenceCheck),
    Done(CheckOutOutcome),
}

/// Check-in: geofence, then face, then the attendance write. Strictly
/// sequential; the first failure aborts the attempt.
pub async fn check_in(
    pool: &MySqlPool,
    verifier: &FaceVerifier,
    user_id: u64,
    request: &CheckRequest,
) -> Result<CheckInOutcome> {
    request.validate()?;
    let now = Utc::now();

    let mut state = CheckInState::ValidatingGeofence;
    loop {
        state = match state {
            CheckInState::ValidatingGeofence => {
                let check = geofence::validate_location(
                    pool,
                    request.company_id,
                    request.latitude,
                    request.longitude,
                )
                .await?;
                if !check.within_boundary {
                    return Err(check.violation());
                }
                CheckInState::VerifyingFace(check)
            }

            CheckInState::VerifyingFace(geofence) => {
                let face = verifier
                    .verify_identity(pool, user_id, request.company_id, &request.photo)
                    .await?;
                if !face.verified {
                    return Err(AttendanceError::FaceMismatch {
                        reason: face.reason,
                        confidence: face.confidence,
                    });
                }
                CheckInState::Recording(geofence, face)
            }

            CheckInState::Recording(geofence, face) => {
                let attendance = recorder::record_check_in(
                    pool,
                    user_id,
                    request.company_id,
                    now,
                    request.latitude,
                    request.longitude,
                    &request.photo,
                )
                .await?;
                CheckInState::Done(CheckInOutcome {
                    attendance,
                    geofence,
                    face,
                })
            }

            CheckInState::Done(outcome) => {
                info!(
                    user_id,
                    company_id = request.company_id,
                    attendance_id = outcome.attendance.id,
                    enrolled_now = outcome.face.enrolled_now,
                    "Check-in complete"
                );
                return Ok(outcome);
            }
        };
    }
}

/// Check-out: geofence, then the attendance update. No face verification on
/// the way out; the captured photo is stored on the row regardless.
pub async fn check_out(
    pool: &MySqlPool,
    user_id: u64,
    request: &CheckRequest,
) -> Result<CheckOutOutcome> {
    request.validate()?;
    let now = Utc::now();

    let mut state = CheckOutState::ValidatingGeofence;
    loop {
        state = match state {
            CheckOutState::ValidatingGeofence => {
                let check = geofence::validate_location(
                    pool,
                    request.company_id,
                    request.latitude,
                    request.longitude,
                )
                .await?;
                if !check.within_boundary {
                    return Err(check.violation());
                }
                CheckOutState::Recording(check)
            }

            CheckOutState::Recording(geofence) => {
                let attendance = recorder::record_check_out(
                    pool,
                    user_id,
                    request.company_id,
                    now,
                    request.latitude,
                    request.longitude,
                    &request.photo,
                )
                .await?;
                let hours_worked = attendance.hours_worked.unwrap_or(0.0);
                CheckOutState::Done(CheckOutOutcome {
                    attendance,
                    geofence,
                    hours_worked,
                })
            }

            CheckOutState::Done(outcome) => {
                info!(
                    user_id,
                    company_id = request.company_id,
                    attendance_id = outcome.attendance.id,
                    hours_worked = outcome.hours_worked,
                    "Check-out complete"
                );
                return Ok(outcome);
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(lat: f64, lng: f64, photo: &str) -> CheckRequest {
        CheckRequest {
            company_id: 1,
            latitude: lat,
            longitude: lng,
            photo: photo.to_string(),
        }
    }

    #[test]
    fn rejects_bad_coordinates_before_any_step() {
        let req = request(120.0, 0.0, "data:image/jpeg;base64,AAAA");
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_bad_photo_before_any_step() {
        let req = request(40.0, -73.0, "not-a-photo");
        assert!(req.validate().is_err());
    }

    #[test]
    fn well_formed_request_passes_validation() {
        let req = request(40.0, -73.0, "data:image/jpeg;base64,AAAA");
        assert!(req.validate().is_ok());
    }
}
