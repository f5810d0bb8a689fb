//! HTTP surface. Handlers decode and authenticate, then delegate to the
//! [`Scheduler`]; every body is wrapped in the `{success, data}` envelope.

mod admin;
mod auth;
mod error;
mod public;

pub use auth::{JwtVerifier, TokenClaims};
pub use error::{ApiError, TRY_AGAIN};

use std::sync::Arc;

use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::scheduler::{BookingError, Scheduler};

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<Scheduler>,
    pub verifier: Arc<JwtVerifier>,
    /// Reject anonymous bookings with 401.
    pub booking_requires_login: bool,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

pub(crate) fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

pub(crate) type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        BookingError::Validation(format!("invalid date {raw:?}: expected YYYY-MM-DD")).into()
    })
}

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/health", get(public::health))
        .route("/api/services", get(public::list_services))
        .route("/api/working-hours", get(public::working_hours))
        .route("/api/appointments/availability", get(public::availability))
        .route("/api/appointments", post(public::create_booking));

    let admin = Router::new()
        .route("/api/admin/appointments", get(admin::list_appointments))
        .route("/api/admin/appointments/{id}/status", patch(admin::set_status))
        .route("/api/admin/working-hours", get(admin::list_working_hours))
        .route("/api/admin/working-hours/{day}", put(admin::update_working_hours))
        .route("/api/admin/closed-dates", get(admin::closed_dates))
        .route(
            "/api/admin/closed-dates/{date}",
            put(admin::close_date).delete(admin::reopen_date),
        )
        .route(
            "/api/admin/services",
            get(admin::list_services).post(admin::create_service),
        )
        .route("/api/admin/services/{id}", patch(admin::update_service));

    Router::new()
        .merge(public)
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
