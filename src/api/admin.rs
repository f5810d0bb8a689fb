use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use ulid::Ulid;

use crate::model::*;
use crate::scheduler::{
    require_admin, AppointmentQuery, BookingError, ServiceDraft, ServicePatch, WorkingHoursPatch,
};

use super::{ok, parse_date, ApiError, ApiResult, AppState};

fn parse_id(raw: &str, what: &str) -> Result<Ulid, ApiError> {
    Ulid::from_string(raw.trim())
        .map_err(|_| BookingError::NotFound(format!("{what} not found")).into())
}

pub async fn list_appointments(
    State(state): State<AppState>,
    claim: Claim,
    query: Result<Query<AppointmentQuery>, QueryRejection>,
) -> ApiResult<Vec<Appointment>> {
    require_admin(&claim)?;
    let Query(query) = query?;
    let filter = query.into_filter()?;
    Ok(ok(state.scheduler.list_appointments(&claim, filter).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    status: Option<String>,
}

pub async fn set_status(
    State(state): State<AppState>,
    claim: Claim,
    Path(id): Path<String>,
    body: Result<Json<StatusChange>, JsonRejection>,
) -> ApiResult<Appointment> {
    require_admin(&claim)?;
    let Json(body) = body?;
    let status = body
        .status
        .ok_or_else(|| BookingError::Validation("status is required".into()))?;
    let id = parse_id(&id, "appointment")?;
    Ok(ok(state.scheduler.set_status(&claim, id, &status).await?))
}

pub async fn list_working_hours(
    State(state): State<AppState>,
    claim: Claim,
) -> ApiResult<Vec<WorkingHours>> {
    require_admin(&claim)?;
    Ok(ok(state.scheduler.list_working_hours().await?))
}

pub async fn update_working_hours(
    State(state): State<AppState>,
    claim: Claim,
    day: Result<Path<u8>, PathRejection>,
    patch: Result<Json<WorkingHoursPatch>, JsonRejection>,
) -> ApiResult<WorkingHours> {
    require_admin(&claim)?;
    let Path(day) = day?;
    let Json(patch) = patch?;
    Ok(ok(state
        .scheduler
        .update_working_hours(&claim, day, patch)
        .await?))
}

pub async fn closed_dates(
    State(state): State<AppState>,
    claim: Claim,
) -> ApiResult<Vec<NaiveDate>> {
    Ok(ok(state.scheduler.closed_dates(&claim).await?))
}

pub async fn close_date(
    State(state): State<AppState>,
    claim: Claim,
    Path(raw): Path<String>,
) -> ApiResult<Value> {
    require_admin(&claim)?;
    let date = parse_date(&raw)?;
    state.scheduler.close_date(&claim, date).await?;
    Ok(ok(json!({ "date": date, "closed": true })))
}

pub async fn reopen_date(
    State(state): State<AppState>,
    claim: Claim,
    Path(raw): Path<String>,
) -> ApiResult<Value> {
    require_admin(&claim)?;
    let date = parse_date(&raw)?;
    state.scheduler.reopen_date(&claim, date).await?;
    Ok(ok(json!({ "date": date, "closed": false })))
}

pub async fn list_services(
    State(state): State<AppState>,
    claim: Claim,
) -> ApiResult<Vec<Service>> {
    require_admin(&claim)?;
    Ok(ok(state.scheduler.list_services(true).await?))
}

pub async fn create_service(
    State(state): State<AppState>,
    claim: Claim,
    draft: Result<Json<ServiceDraft>, JsonRejection>,
) -> ApiResult<Service> {
    require_admin(&claim)?;
    let Json(draft) = draft?;
    Ok(ok(state.scheduler.create_service(&claim, draft).await?))
}

pub async fn update_service(
    State(state): State<AppState>,
    claim: Claim,
    Path(id): Path<String>,
    patch: Result<Json<ServicePatch>, JsonRejection>,
) -> ApiResult<Service> {
    require_admin(&claim)?;
    let Json(patch) = patch?;
    let id = parse_id(&id, "service")?;
    Ok(ok(state.scheduler.update_service(&claim, id, patch).await?))
}
