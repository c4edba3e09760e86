//! HTTP handlers

pub mod books;
pub mod error;
pub mod users;

pub use error::ApiError;

use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};

/// Success envelope shared by every JSON endpoint
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub result: T,
}

pub fn envelope<T: Serialize>(result: T) -> Json<Envelope<T>> {
    Json(Envelope { result })
}

pub async fn root() -> &'static str {
    "hello world"
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "backend": state.books.backend(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
