use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::scheduler::BookingError;

/// User-facing message for every infrastructure failure.
pub const TRY_AGAIN: &str = "temporarily unavailable, please try again";

/// Everything a handler can fail with, mapped onto HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing, malformed, or expired bearer token.
    #[error("{0}")]
    Unauthenticated(String),
    /// Request could not be decoded.
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Booking(#[from] BookingError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Booking(e) => match e {
                BookingError::Validation(_) => StatusCode::BAD_REQUEST,
                BookingError::NotFound(_) => StatusCode::NOT_FOUND,
                BookingError::SlotConflict { .. } => StatusCode::CONFLICT,
                BookingError::Authorization(_) => StatusCode::FORBIDDEN,
                BookingError::StorageTimeout | BookingError::StorageUnavailable => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            },
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::Booking(e) if e.is_infrastructure() => TRY_AGAIN.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({ "success": false, "error": self.public_message() });
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
