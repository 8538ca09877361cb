//! Bearer-token authentication middleware and claim helpers.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use super::error::ApiError;
use super::AppState;
use crate::domain::Role;
use crate::services::Claims;

/// Validates the `Authorization: Bearer` header on every protected route
/// and injects the token claims into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;

    let token = match header.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token,
        _ => return Err(ApiError::unauthorized("invalid authorization header")),
    };

    let claims = state
        .auth
        .verify_token(token)
        .map_err(|_| ApiError::unauthorized("invalid token"))?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Resolve the caller's ownership scope.
///
/// A `client`-role token without a client identity is structurally valid
/// but operationally unusable; reject it with 401 before any service call.
/// Admin tokens carry no scope.
pub fn client_scope(claims: &Claims) -> Result<Option<&str>, ApiError> {
    match claims.role {
        Role::Client => match claims.client_id.as_deref() {
            Some(id) if !id.is_empty() => Ok(Some(id)),
            _ => Err(ApiError::unauthorized("token missing client identity")),
        },
        Role::Admin => Ok(None),
    }
}
