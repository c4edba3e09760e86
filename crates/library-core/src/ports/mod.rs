//! Port traits (interfaces) the storage backends implement

pub mod storage;

pub use storage::{BookStore, Repository, UserStore};
