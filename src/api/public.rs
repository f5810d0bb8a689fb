use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::model::*;
use crate::scheduler::{BookingError, BookingRequest};

use super::{ok, parse_date, ApiError, ApiResponse, ApiResult, AppState};

pub async fn health() -> Json<ApiResponse<Value>> {
    ok(json!({ "status": "ok" }))
}

pub async fn list_services(State(state): State<AppState>) -> ApiResult<Vec<Service>> {
    Ok(ok(state.scheduler.list_services(false).await?))
}

pub async fn working_hours(State(state): State<AppState>) -> ApiResult<Vec<WorkingHours>> {
    Ok(ok(state.scheduler.list_working_hours().await?))
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityParams {
    date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityView {
    date: NaiveDate,
    is_open: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    time_slots: Vec<SlotAvailability>,
}

impl From<DayAvailability> for AvailabilityView {
    fn from(day: DayAvailability) -> Self {
        Self {
            date: day.date(),
            is_open: day.closed_reason().is_none(),
            message: day.closed_reason().map(ClosedReason::message),
            time_slots: day.slots().to_vec(),
        }
    }
}

pub async fn availability(
    State(state): State<AppState>,
    params: Result<Query<AvailabilityParams>, QueryRejection>,
) -> ApiResult<AvailabilityView> {
    let Query(params) = params?;
    let raw = params
        .date
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| BookingError::Validation("date query parameter is required".into()))?;
    let date = parse_date(&raw)?;
    let day = state.scheduler.resolve_availability(date).await?;
    Ok(ok(day.into()))
}

pub async fn create_booking(
    State(state): State<AppState>,
    claim: Option<Claim>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Appointment>>), ApiError> {
    if state.booking_requires_login && claim.is_none() {
        return Err(ApiError::Unauthenticated(
            "sign in to book an appointment".into(),
        ));
    }
    let Json(request) = payload?;
    let created = state
        .scheduler
        .create_booking(request, claim.as_ref())
        .await?;
    Ok((StatusCode::CREATED, ok(created)))
}
