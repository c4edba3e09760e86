//! User handlers

use super::{envelope, ApiError, Envelope};
use crate::extractors::AuthUser;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use library_core::{LibraryError, User, UserDraft, UserLogin};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    id: Uuid,
    token: String,
}

/// Respond with the token both in the `Authorization` header and the body
fn token_response(state: &AppState, id: Uuid) -> Result<Response, ApiError> {
    let token = state.tokens.issue(id)?;
    let header_value = format!("Bearer {}", token);
    Ok((
        [(header::AUTHORIZATION, header_value)],
        envelope(TokenResponse { id, token }),
    )
        .into_response())
}

pub async fn registration(
    State(state): State<AppState>,
    Json(draft): Json<UserDraft>,
) -> Result<Response, ApiError> {
    info!("Registration attempt for: {}", draft.email);
    draft.validate().map_err(LibraryError::from)?;

    let id = state.users.registration_user(draft).await?;

    info!("Registration successful, user {}", id);
    token_response(&state, id)
}

pub async fn login(
    State(state): State<AppState>,
    Json(login): Json<UserLogin>,
) -> Result<Response, ApiError> {
    info!("Login attempt for: {}", login.email);
    login.validate().map_err(LibraryError::from)?;

    let id = state.users.login_user(&login).await?;

    info!("Login successful, user {}", id);
    token_response(&state, id)
}

pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Envelope<Vec<User>>>, ApiError> {
    Ok(envelope(state.users.get_users().await?))
}

pub async fn get(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Envelope<User>>, ApiError> {
    Ok(envelope(state.users.get_user(&id).await?))
}

pub async fn add(
    State(state): State<AppState>,
    user: AuthUser,
    Json(draft): Json<UserDraft>,
) -> Result<(StatusCode, Json<Envelope<Uuid>>), ApiError> {
    draft.validate().map_err(LibraryError::from)?;

    let id = state.users.add_user(draft).await?;

    info!("User {} added by {}", id, user.user_id);
    Ok((StatusCode::CREATED, envelope(id)))
}

pub async fn edit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(draft): Json<UserDraft>,
) -> Result<Json<Envelope<&'static str>>, ApiError> {
    draft.validate().map_err(LibraryError::from)?;

    state.users.edit_user(&id, draft).await?;

    info!("User {} edited by {}", id, user.user_id);
    Ok(envelope("User edited"))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Envelope<&'static str>>, ApiError> {
    state.users.delete_user(&id).await?;

    info!("User {} removed by {}", id, user.user_id);
    Ok(envelope("User removed"))
}
