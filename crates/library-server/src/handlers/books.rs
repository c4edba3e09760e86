//! Book handlers

use super::{envelope, ApiError, Envelope};
use crate::extractors::AuthUser;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use library_core::{Book, BookDraft, LibraryError};
use tracing::{debug, info};
use uuid::Uuid;

pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Envelope<Vec<Book>>>, ApiError> {
    Ok(envelope(state.books.get_books().await?))
}

pub async fn get(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Book>>, ApiError> {
    Ok(envelope(state.books.get_book(&id).await?))
}

pub async fn add(
    State(state): State<AppState>,
    user: AuthUser,
    Json(draft): Json<BookDraft>,
) -> Result<(StatusCode, Json<Envelope<Uuid>>), ApiError> {
    draft.validate().map_err(LibraryError::from)?;

    let id = state.books.add_book(draft).await?;

    info!("Book {} added by {}", id, user.user_id);
    Ok((StatusCode::CREATED, envelope(id)))
}

pub async fn edit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(draft): Json<BookDraft>,
) -> Result<Json<Envelope<&'static str>>, ApiError> {
    draft.validate().map_err(LibraryError::from)?;

    state.books.edit_book(&id, draft).await?;

    info!("Book {} edited by {}", id, user.user_id);
    Ok(envelope("Book edited"))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Envelope<&'static str>>, ApiError> {
    state.books.delete_book(&id).await?;
    state.deletions.record_deletion();

    info!("Book {} removed by {}", id, user.user_id);
    debug!("{} deletions pending purge", state.deletions.pending());
    Ok(envelope("Book removed"))
}
