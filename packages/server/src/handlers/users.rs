//! User profile handlers.
//!
//! - `POST  /v1/users`      — register a user with an Ed25519 public key.
//! - `GET   /v1/users/{id}` — fetch a profile.
//! - `PATCH /v1/users/{id}` — partial update, signed by `{id}` itself.
//!
//! Profile edits never touch the follow graph.

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use socialgraph::{decode_public_key, validate_profile, validation, UserId};
use socialgraph_api::{RegisterRequest, UpdateProfileRequest, UserProfile};

use crate::{error::AppError, middleware::auth::RequireAuth, storage::NewUser};

use super::AppState;

fn check_public_key(key: &str) -> Result<(), AppError> {
    decode_public_key(key)
        .map(|_| ())
        .map_err(|e| AppError::Validation(format!("public_key: {e}")))
}

/// `POST /v1/users` — register a new user.
///
/// Returns 201 with the stored profile, 400 if a field fails validation,
/// 409 if the handle or email is already registered.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;

    let display_name = req.display_name.trim().to_string();
    validate_profile(&display_name, &req.handle, &req.email)?;
    check_public_key(&req.public_key)?;

    let profile = state
        .storage
        .create_user(&NewUser {
            display_name,
            handle: req.handle,
            email: req.email,
            public_key: req.public_key,
        })
        .await?;

    tracing::info!(user = %profile.id, handle = %profile.handle, "registered user");
    Ok((StatusCode::CREATED, Json(profile)))
}

/// `GET /v1/users/{id}`
pub async fn get_user(
    State(state): State<AppState>,
    path: Result<Path<UserId>, PathRejection>,
) -> Result<Json<UserProfile>, AppError> {
    let Path(id) = path?;
    Ok(Json(state.require_user(id).await?))
}

/// `PATCH /v1/users/{id}` — overwrite the fields present in the body.
///
/// Returns 403 if the signer is not `{id}`, 400 for an empty or invalid
/// update.
pub async fn update_user(
    State(state): State<AppState>,
    path: Result<Path<UserId>, PathRejection>,
    auth: RequireAuth,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<UserProfile>, AppError> {
    let Path(id) = path?;
    let Json(mut update) = payload?;

    if auth.user_id != id {
        return Err(AppError::Forbidden(
            "cannot edit another user's profile".into(),
        ));
    }
    if update.is_empty() {
        return Err(AppError::Validation("update contains no fields".into()));
    }

    if let Some(name) = update.display_name.as_mut() {
        *name = name.trim().to_string();
        validation::validate_display_name(name)?;
    }
    if let Some(handle) = &update.handle {
        validation::validate_handle(handle)?;
    }
    if let Some(email) = &update.email {
        validation::validate_email(email)?;
    }
    if let Some(key) = &update.public_key {
        check_public_key(key)?;
    }

    let profile = state.storage.update_user(id, &update).await?;

    tracing::info!(user = %id, "updated profile");
    Ok(Json(profile))
}
