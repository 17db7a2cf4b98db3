//! Account handlers: registration and login.

use super::{run_blocking, AppState};
use crate::error::ApiError;
use crate::store::StoreError;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

/// Request body for both register and login.
#[derive(Deserialize)]
pub(crate) struct CredentialsBody {
    username: String,
    password: String,
}

impl CredentialsBody {
    fn parse(body: Result<Json<Self>, JsonRejection>) -> Result<Self, ApiError> {
        let Json(body) =
            body.map_err(|e| ApiError::bad_request(format!("Invalid request: {}", e.body_text())))?;
        if body.username.is_empty() || body.password.is_empty() {
            return Err(ApiError::bad_request(
                "Invalid request: username and password are required",
            ));
        }
        Ok(body)
    }
}

/// POST /api/register: create a new user account.
pub(crate) async fn handle_register(
    State(state): State<AppState>,
    body: Result<Json<CredentialsBody>, JsonRejection>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let CredentialsBody { username, password } = CredentialsBody::parse(body)?;

    // Fast path only; the store's uniqueness constraint is authoritative.
    let credentials = state.credentials.clone();
    let name = username.clone();
    match run_blocking(move || credentials.exists(&name)).await? {
        Ok(false) => {}
        Ok(true) => return Err(ApiError::Conflict("User already exists.".into())),
        Err(e) => {
            tracing::error!(error = %e, "Credential lookup failed during registration");
            return Err(ApiError::internal("Database error."));
        }
    }

    let hasher = state.hasher.clone();
    let password_hash = run_blocking(move || hasher.hash(&password))
        .await?
        .map_err(|e| {
            tracing::error!(error = %e, "Password hashing failed");
            ApiError::internal("Error hashing password.")
        })?;

    let credentials = state.credentials.clone();
    let name = username.clone();
    match run_blocking(move || credentials.insert(&name, &password_hash)).await? {
        Ok(()) => {}
        Err(StoreError::Conflict) => {
            tracing::debug!(username = %username, "Registration lost a uniqueness race");
            return Err(ApiError::Conflict("User already exists.".into()));
        }
        Err(e) => {
            tracing::error!(error = %e, "Credential insert failed");
            return Err(ApiError::internal("Error creating user."));
        }
    }

    tracing::info!(username = %username, "User registered");
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "User registered successfully!" })),
    ))
}

/// POST /api/login: verify credentials and issue a session token.
///
/// Unknown usernames and wrong passwords produce the same 401 body, and an
/// unknown username still pays for one verification.
pub(crate) async fn handle_login(
    State(state): State<AppState>,
    body: Result<Json<CredentialsBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let CredentialsBody { username, password } = CredentialsBody::parse(body)?;

    let credentials = state.credentials.clone();
    let hasher = state.hasher.clone();
    let name = username.clone();
    let verified = run_blocking(move || {
        let stored_hash = credentials.get_hash(&name)?;
        Ok::<_, StoreError>(match stored_hash {
            Some(hash) => hasher.verify(&password, &hash),
            None => {
                hasher.verify_dummy(&password);
                false
            }
        })
    })
    .await?
    .map_err(|e| {
        tracing::error!(error = %e, "Credential lookup failed during login");
        ApiError::internal("Database error.")
    })?;

    if !verified {
        tracing::debug!(username = %username, "Login rejected");
        return Err(ApiError::invalid_credentials());
    }

    let token = state.tokens.issue(&username).map_err(|e| {
        tracing::error!(error = %e, "Token issuance failed");
        ApiError::internal("Error generating token.")
    })?;

    tracing::info!(username = %username, "User logged in");
    Ok(Json(serde_json::json!({ "token": token })))
}
