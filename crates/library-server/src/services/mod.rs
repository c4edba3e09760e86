//! Business logic services

pub mod auth;
pub mod books;
pub mod sweeper;
pub mod users;

pub use auth::TokenService;
pub use books::BookService;
pub use sweeper::{DeletionCounter, RetentionSweeper};
pub use users::UserService;
