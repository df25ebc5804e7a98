//! JSON-over-HTTP access layer. Authenticates callers, turns requests into
//! scheduler calls, and maps scheduler errors onto status codes.

mod bookings;
mod error;
mod extract;
mod halls;

pub use error::ApiError;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::auth::TokenAuthSource;
use crate::model::Ms;
use crate::observability;
use crate::scheduler::Scheduler;

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<Scheduler>,
    pub auth: Arc<TokenAuthSource>,
    /// In-flight request permits.
    pub limiter: Arc<Semaphore>,
}

impl AppState {
    pub fn new(scheduler: Arc<Scheduler>, auth: TokenAuthSource, max_in_flight: usize) -> Self {
        Self {
            scheduler,
            auth: Arc::new(auth),
            limiter: Arc::new(Semaphore::new(max_in_flight)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/bookings",
            get(bookings::list)
                .post(bookings::create)
                .patch(bookings::update_status)
                .delete(bookings::delete),
        )
        .route(
            "/halls",
            get(halls::list).post(halls::create).delete(halls::delete),
        )
        .route("/halls/availability", get(halls::availability))
        .route("/health", get(health))
        .layer(middleware::from_fn_with_state(state.clone(), limit_and_measure))
        .with_state(state)
}

/// Caps in-flight requests and records per-route request metrics.
async fn limit_and_measure(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let route = match request.extensions().get::<MatchedPath>() {
        Some(path) => format!("{} {}", request.method(), path.as_str()),
        None => "unmatched".to_string(),
    };

    let Ok(_permit) = state.limiter.clone().try_acquire_owned() else {
        warn!("in-flight limit reached, rejecting {route}");
        metrics::counter!(observability::CONNECTIONS_REJECTED_TOTAL).increment(1);
        return ApiError::Overloaded.into_response();
    };

    let start = Instant::now();
    let response = next.run(request).await;
    let status = response.status().as_u16().to_string();
    metrics::counter!(observability::REQUESTS_TOTAL, "route" => route.clone(), "status" => status)
        .increment(1);
    metrics::histogram!(observability::REQUEST_DURATION_SECONDS, "route" => route)
        .record(start.elapsed().as_secs_f64());
    response
}

async fn health(State(state): State<AppState>) -> Response {
    success(
        StatusCode::OK,
        json!({
            "status": "ok",
            "halls": state.scheduler.hall_count(),
            "bookings": state.scheduler.booking_count(),
        }),
    )
}

#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

/// `{"success": true, "data": ...}` with the given status.
fn success<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(Envelope { success: true, data })).into_response()
}

/// Booking times are range-checked on the way in; anything that still fails
/// to convert is logged and rendered as the epoch.
fn to_datetime(ms: Ms) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_else(|| {
        warn!("timestamp {ms} ms is outside the representable range");
        DateTime::UNIX_EPOCH
    })
}
