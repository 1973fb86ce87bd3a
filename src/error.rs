use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::repository::StoreError;

/// Outcomes the attendance core reports to its callers.
#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PolicyViolation(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("storage failure: {0}")]
    Storage(#[source] StoreError),
}

pub type AttendanceResult<T> = Result<T, AttendanceError>;

pub const DUPLICATE_ATTENDANCE: &str =
    "Attendance already recorded for this session and date. It cannot be recorded twice.";

impl From<StoreError> for AttendanceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => AttendanceError::Conflict(DUPLICATE_ATTENDANCE.to_string()),
            other => AttendanceError::Storage(other),
        }
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::NotFound(_) => StatusCode::NOT_FOUND,
            AttendanceError::Conflict(_) => StatusCode::CONFLICT,
            AttendanceError::PolicyViolation(_) => StatusCode::FORBIDDEN,
            AttendanceError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AttendanceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AttendanceError::Storage(e) => {
                tracing::error!(error = %e, "Attendance storage failure");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "message": message
        }))
    }
}
