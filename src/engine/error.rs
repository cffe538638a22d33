use actix_web::{HttpResponse, http::StatusCode};
use serde_json::json;
use thiserror::Error;

/// Everything that can abort a check-in/check-out attempt.
///
/// None of these are recovered from locally: each one aborts the whole
/// attempt and surfaces to the caller without partial attendance state.
/// Retry is left to the operator.
#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not a member of this company")]
    Unauthenticated,

    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("already checked in today")]
    AlreadyCheckedIn,

    #[error("already checked out today")]
    AlreadyCheckedOut,

    #[error("no check-in found for today")]
    NoCheckInFound,

    #[error("outside all configured boundaries: {distance_m}m away from {nearest}")]
    GeofenceViolation { distance_m: i64, nearest: String },

    #[error("face verification failed: {reason}")]
    FaceMismatch { reason: String, confidence: f64 },
}

pub type Result<T, E = AttendanceError> = std::result::Result<T, E>;

impl From<sqlx::Error> for AttendanceError {
    fn from(e: sqlx::Error) -> Self {
        AttendanceError::Upstream(format!("database: {e}"))
    }
}

impl From<reqwest::Error> for AttendanceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AttendanceError::Upstream("comparison call timed out".to_string())
        } else {
            AttendanceError::Upstream(format!("ai gateway: {e}"))
        }
    }
}

impl actix_web::ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AttendanceError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AttendanceError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AttendanceError::AlreadyCheckedIn
            | AttendanceError::AlreadyCheckedOut
            | AttendanceError::NoCheckInFound
            | AttendanceError::GeofenceViolation { .. }
            | AttendanceError::FaceMismatch { .. } => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.to_string()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;

    #[test]
    fn business_rejections_are_bad_requests() {
        assert_eq!(
            AttendanceError::AlreadyCheckedIn.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AttendanceError::NoCheckInFound.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AttendanceError::GeofenceViolation {
                distance_m: 500,
                nearest: "HQ".into()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn upstream_maps_to_bad_gateway() {
        assert_eq!(
            AttendanceError::Upstream("boom".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn violation_message_carries_distance_and_site() {
        let e = AttendanceError::GeofenceViolation {
            distance_m: 500,
            nearest: "HQ".into(),
        };
        assert_eq!(
            e.to_string(),
            "outside all configured boundaries: 500m away from HQ"
        );
    }
}
