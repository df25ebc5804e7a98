use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::auth::Principal;
use crate::model::*;
use crate::scheduler::policy::require_admin;

use super::{ApiError, AppState, success, to_datetime};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BookingView {
    id: BookingId,
    hall_id: HallId,
    hall_name: String,
    user_email: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    purpose: String,
    status: BookingStatus,
    created_at: DateTime<Utc>,
}

impl BookingView {
    fn new(booking: Booking, hall_name: String) -> Self {
        Self {
            id: booking.id,
            hall_id: booking.hall_id,
            hall_name,
            user_email: booking.requester_email,
            start_time: to_datetime(booking.span.start),
            end_time: to_datetime(booking.span.end),
            purpose: booking.purpose,
            status: booking.status,
            created_at: to_datetime(booking.created_at),
        }
    }
}

impl From<BookingInfo> for BookingView {
    fn from(info: BookingInfo) -> Self {
        Self::new(info.booking, info.hall_name)
    }
}

/// Unknown fields (a client-supplied `userEmail` included) are ignored; the
/// requester is always the authenticated caller.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateBooking {
    hall_id: HallId,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    #[serde(default)]
    purpose: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusUpdate {
    id: BookingId,
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListQuery {
    hall_id: Option<HallId>,
    requester: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdQuery {
    id: Option<String>,
}

/// Parse a required `?id=` parameter.
pub(super) fn required_id(query: Result<Query<IdQuery>, QueryRejection>, what: &str) -> Result<Ulid, ApiError> {
    let Query(query) = query?;
    let raw = query
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{what} id required")))?;
    raw.trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid {what} id")))
}

pub(super) async fn create(
    State(state): State<AppState>,
    principal: Principal,
    body: Result<Json<CreateBooking>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let booking = state
        .scheduler
        .request_booking(
            body.hall_id,
            &principal,
            body.start_time.timestamp_millis(),
            body.end_time.timestamp_millis(),
            &body.purpose,
        )
        .await?;
    let hall_name = state.scheduler.hall_name(&booking.hall_id);
    Ok(success(StatusCode::CREATED, BookingView::new(booking, hall_name)))
}

pub(super) async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let filter = BookingFilter {
        hall_id: query.hall_id,
        requester_email: query.requester.filter(|r| !r.trim().is_empty()),
    };
    let bookings: Vec<BookingView> = state
        .scheduler
        .list_bookings(&filter)
        .await
        .into_iter()
        .map(BookingView::from)
        .collect();
    Ok(success(StatusCode::OK, bookings))
}

/// Admin check comes before body parsing, so non-admins always see 403.
pub(super) async fn update_status(
    State(state): State<AppState>,
    principal: Principal,
    body: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_admin(&principal)?;
    let Json(body) = body?;
    let status: BookingStatus = body
        .status
        .parse()
        .map_err(|e: UnknownStatus| ApiError::BadRequest(e.to_string()))?;

    let booking = state.scheduler.set_status(body.id, &principal, status).await?;
    let hall_name = state.scheduler.hall_name(&booking.hall_id);
    Ok(success(StatusCode::OK, BookingView::new(booking, hall_name)))
}

pub(super) async fn delete(
    State(state): State<AppState>,
    principal: Principal,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let id = required_id(query, "booking")?;
    let removed = state.scheduler.cancel_booking(id, &principal).await?;
    Ok(success(StatusCode::OK, serde_json::json!({ "id": removed.id })))
}
