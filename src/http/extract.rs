use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use crate::auth::Principal;
use crate::observability;

use super::{ApiError, AppState};

/// Resolves `Authorization: Bearer <token>` against the token table.
impl FromRequestParts<AppState> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty());

        match token.and_then(|token| state.auth.resolve(token)) {
            Some(principal) => Ok(principal),
            None => {
                metrics::counter!(observability::AUTH_FAILURES_TOTAL).increment(1);
                warn!("unauthenticated {} {}", parts.method, parts.uri.path());
                Err(ApiError::Unauthenticated)
            }
        }
    }
}
