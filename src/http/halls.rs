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

use crate::auth::Principal;
use crate::model::*;
use crate::scheduler::policy::require_admin;

use super::bookings::{IdQuery, required_id};
use super::{ApiError, AppState, success, to_datetime};

#[derive(Debug, Deserialize)]
pub(crate) struct CreateHall {
    name: String,
    capacity: u32,
    location: Option<String>,
    image: Option<String>,
    #[serde(default)]
    amenities: Vec<String>,
}

impl From<CreateHall> for NewHall {
    fn from(body: CreateHall) -> Self {
        NewHall {
            name: body.name,
            capacity: body.capacity,
            location: body.location,
            image: body.image,
            amenities: body.amenities,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AvailabilityQuery {
    id: HallId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SlotView {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

pub(super) async fn list(State(state): State<AppState>) -> Response {
    success(StatusCode::OK, state.scheduler.list_halls())
}

pub(super) async fn create(
    State(state): State<AppState>,
    principal: Principal,
    body: Result<Json<CreateHall>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_admin(&principal)?;
    let Json(body) = body?;
    let hall = state.scheduler.create_hall(&principal, body.into()).await?;
    Ok(success(StatusCode::CREATED, hall))
}

pub(super) async fn delete(
    State(state): State<AppState>,
    principal: Principal,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    require_admin(&principal)?;
    let id = required_id(query, "hall")?;
    state.scheduler.delete_hall(&principal, id).await?;
    Ok(success(StatusCode::OK, serde_json::json!({ "id": id })))
}

pub(super) async fn availability(
    State(state): State<AppState>,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let slots: Vec<SlotView> = state
        .scheduler
        .free_slots(query.id, query.start.timestamp_millis(), query.end.timestamp_millis())
        .await?
        .into_iter()
        .map(|span| SlotView {
            start_time: to_datetime(span.start),
            end_time: to_datetime(span.end),
        })
        .collect();
    Ok(success(StatusCode::OK, slots))
}
