//! HTTP routing

use crate::handlers;
use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        // Users
        .route("/users/registration", post(handlers::users::registration))
        .route("/users/login", post(handlers::users::login))
        .route(
            "/users",
            get(handlers::users::list).post(handlers::users::add),
        )
        .route(
            "/users/",
            get(handlers::users::list).post(handlers::users::add),
        )
        .route(
            "/users/:id",
            get(handlers::users::get)
                .put(handlers::users::edit)
                .delete(handlers::users::delete),
        )
        // Books
        .route(
            "/books",
            get(handlers::books::list).post(handlers::books::add),
        )
        .route(
            "/books/",
            get(handlers::books::list).post(handlers::books::add),
        )
        .route(
            "/books/:id",
            get(handlers::books::get)
                .put(handlers::books::edit)
                .delete(handlers::books::delete),
        )
        // Layers
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
