//! Registration and login endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::ApiError;
use super::validate::required_str;
use super::AppState;
use crate::domain::Role;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RegisterRequest {
    username: Option<String>,
    password: Option<String>,
    email: Option<String>,
    role: Option<String>,
    client_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    token_type: &'static str,
    /// Seconds until the token expires.
    expires_in: i64,
}

/// `POST /auth/register` — create a user account.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(value) = payload.map_err(|_| ApiError::bad_request("invalid payload"))?;
    let request: RegisterRequest =
        serde_json::from_value(value).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let username = required_str(request.username, "username").map_err(ApiError::bad_request)?;
    let password = required_str(request.password, "password").map_err(ApiError::bad_request)?;
    let email = required_str(request.email, "email").map_err(ApiError::bad_request)?;
    let role = request
        .role
        .as_deref()
        .and_then(Role::parse)
        .ok_or_else(|| ApiError::bad_request("role must be one of: admin, client"))?;
    let client_id = request.client_id.filter(|id| !id.is_empty());

    state
        .auth
        .register(&username, &password, &email, role, client_id)
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "message": "user created" }))))
}

/// `POST /auth/login` — verify credentials and issue a bearer token.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(value) = payload.map_err(|_| ApiError::bad_request("invalid payload"))?;
    let request: LoginRequest =
        serde_json::from_value(value).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let email = required_str(request.email, "email").map_err(ApiError::bad_request)?;
    let password = required_str(request.password, "password").map_err(ApiError::bad_request)?;

    let (token, _user) = state.auth.login(&email, &password).await?;

    Ok(Json(AuthResponse {
        token,
        token_type: "Bearer",
        expires_in: state.auth.token_ttl_secs(),
    }))
}
