//! PostgreSQL repository

use crate::config::DatabaseSettings;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use library_core::credentials::{hash_password, verify_dummy, verify_password};
use library_core::ports::{BookStore, Repository, UserStore};
use library_core::{
    parse_id, BackendKind, Book, BookDraft, Entity, LibraryError, Result, User, UserDraft,
    UserLogin,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

pub struct PgStore {
    pool: PgPool,
    op_timeout: Duration,
}

impl PgStore {
    pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Self> {
        tracing::info!("Connecting to PostgreSQL...");

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.startup_timeout())
            .connect(&settings.dsn)
            .await
            .context("Failed to connect to PostgreSQL")?;

        tracing::info!("PostgreSQL connection established, running migrations...");

        Self::run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;

        tracing::info!("Database initialization complete");

        Ok(Self {
            pool,
            op_timeout: settings.operation_timeout(),
        })
    }

    async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                password TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                age INTEGER NOT NULL,
                date_registration TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS books (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                author TEXT NOT NULL,
                date_writing DATE,
                deleted BOOLEAN NOT NULL DEFAULT FALSE
            )
            "#,
        )
        .execute(pool)
        .await?;

        // One live row per (name, author); soft-deleted rows are out of scope
        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS books_live_title_idx
            ON books (name, author) WHERE NOT deleted
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn timed<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send,
    {
        tokio::time::timeout(self.op_timeout, fut)
            .await
            .map_err(|_| LibraryError::Timeout(self.op_timeout))?
    }
}

fn persistence(e: sqlx::Error) -> LibraryError {
    tracing::debug!("database error: {}", e);
    LibraryError::Persistence(e.to_string())
}

/// Unique-constraint violations are reported as conflicts, everything else
/// as a persistence failure.
fn conflict_or_persistence(entity: Entity) -> impl Fn(sqlx::Error) -> LibraryError {
    move |e| {
        let unique = e
            .as_database_error()
            .map(|db| db.is_unique_violation())
            .unwrap_or(false);
        if unique {
            LibraryError::AlreadyExists(entity)
        } else {
            persistence(e)
        }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        self.timed(async {
            let rows: Vec<UserRow> = sqlx::query_as(
                r#"
                SELECT id, name, password, email, age, date_registration
                FROM users ORDER BY date_registration, id
                "#,
            )
            .fetch_all(&self.pool)
            .await
            .map_err(persistence)?;

            if rows.is_empty() {
                return Err(LibraryError::EmptyCollection(Entity::User));
            }
            Ok(rows.into_iter().map(Into::into).collect())
        })
        .await
    }

    async fn get_user(&self, id: &str) -> Result<User> {
        let id = parse_id(id)?;
        self.timed(async {
            let row: Option<UserRow> = sqlx::query_as(
                r#"
                SELECT id, name, password, email, age, date_registration
                FROM users WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;

            row.map(Into::into).ok_or(LibraryError::NotFound(Entity::User))
        })
        .await
    }

    async fn save_user(&self, draft: UserDraft) -> Result<Uuid> {
        self.timed(async move {
            let taken: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                    .bind(&draft.email)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(persistence)?;
            if taken {
                return Err(LibraryError::AlreadyExists(Entity::User));
            }

            let id = Uuid::new_v4();
            let password = hash_password(&draft.password)?;

            // The unique index still guards a racing insert of the same email
            sqlx::query(
                r#"
                INSERT INTO users (id, name, password, email, age, date_registration)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(id)
            .bind(&draft.name)
            .bind(&password)
            .bind(&draft.email)
            .bind(draft.age)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(conflict_or_persistence(Entity::User))?;

            Ok(id)
        })
        .await
    }

    async fn edit_user(&self, id: &str, draft: UserDraft) -> Result<()> {
        let id = parse_id(id)?;
        self.timed(async move {
            let mut tx = self.pool.begin().await.map_err(persistence)?;

            let current: Option<(String, String)> =
                sqlx::query_as("SELECT password, email FROM users WHERE id = $1 FOR UPDATE")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(persistence)?;
            let (stored_hash, stored_email) =
                current.ok_or(LibraryError::NotFound(Entity::User))?;

            if stored_email != draft.email {
                let taken: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND id <> $2)",
                )
                .bind(&draft.email)
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(persistence)?;
                if taken {
                    return Err(LibraryError::AlreadyExists(Entity::User));
                }
            }

            let password = if verify_password(&stored_hash, &draft.password)? {
                stored_hash
            } else {
                hash_password(&draft.password)?
            };

            sqlx::query(
                r#"
                UPDATE users SET name = $1, password = $2, email = $3, age = $4
                WHERE id = $5
                "#,
            )
            .bind(&draft.name)
            .bind(&password)
            .bind(&draft.email)
            .bind(draft.age)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(conflict_or_persistence(Entity::User))?;

            tx.commit().await.map_err(persistence)
        })
        .await
    }

    async fn delete_user(&self, id: &str) -> Result<()> {
        let id = parse_id(id)?;
        self.timed(async {
            let result = sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(persistence)?;

            if result.rows_affected() == 0 {
                return Err(LibraryError::NotFound(Entity::User));
            }
            Ok(())
        })
        .await
    }

    async fn validate_credentials(&self, login: &UserLogin) -> Result<Uuid> {
        self.timed(async {
            let row: Option<(Uuid, String)> =
                sqlx::query_as("SELECT id, password FROM users WHERE email = $1")
                    .bind(&login.email)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(persistence)?;

            match row {
                Some((id, hash)) if verify_password(&hash, &login.password)? => Ok(id),
                Some(_) => Err(LibraryError::InvalidCredential),
                None => {
                    verify_dummy(&login.password);
                    Err(LibraryError::InvalidCredential)
                }
            }
        })
        .await
    }
}

#[async_trait]
impl BookStore for PgStore {
    async fn list_books(&self) -> Result<Vec<Book>> {
        self.timed(async {
            let rows: Vec<BookRow> = sqlx::query_as(
                r#"
                SELECT id, name, description, author, date_writing, deleted
                FROM books WHERE NOT deleted ORDER BY name, author
                "#,
            )
            .fetch_all(&self.pool)
            .await
            .map_err(persistence)?;

            if rows.is_empty() {
                return Err(LibraryError::EmptyCollection(Entity::Book));
            }
            Ok(rows.into_iter().map(Into::into).collect())
        })
        .await
    }

    async fn get_book(&self, id: &str) -> Result<Book> {
        let id = parse_id(id)?;
        self.timed(async {
            let row: Option<BookRow> = sqlx::query_as(
                r#"
                SELECT id, name, description, author, date_writing, deleted
                FROM books WHERE id = $1 AND NOT deleted
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;

            row.map(Into::into).ok_or(LibraryError::NotFound(Entity::Book))
        })
        .await
    }

    async fn save_book(&self, draft: BookDraft) -> Result<Uuid> {
        self.timed(async move {
            let taken: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM books WHERE name = $1 AND author = $2 AND NOT deleted)",
            )
            .bind(&draft.name)
            .bind(&draft.author)
            .fetch_one(&self.pool)
            .await
            .map_err(persistence)?;
            if taken {
                return Err(LibraryError::AlreadyExists(Entity::Book));
            }

            let id = Uuid::new_v4();
            sqlx::query(
                r#"
                INSERT INTO books (id, name, description, author, date_writing)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(id)
            .bind(&draft.name)
            .bind(&draft.description)
            .bind(&draft.author)
            .bind(draft.date_writing)
            .execute(&self.pool)
            .await
            .map_err(conflict_or_persistence(Entity::Book))?;

            Ok(id)
        })
        .await
    }

    async fn edit_book(&self, id: &str, draft: BookDraft) -> Result<()> {
        let id = parse_id(id)?;
        self.timed(async move {
            let mut tx = self.pool.begin().await.map_err(persistence)?;

            let current: Option<(String, String)> = sqlx::query_as(
                "SELECT name, author FROM books WHERE id = $1 AND NOT deleted FOR UPDATE",
            )
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(persistence)?;
            let (name, author) = current.ok_or(LibraryError::NotFound(Entity::Book))?;

            if name != draft.name || author != draft.author {
                let taken: bool = sqlx::query_scalar(
                    r#"
                    SELECT EXISTS(
                        SELECT 1 FROM books
                        WHERE name = $1 AND author = $2 AND NOT deleted AND id <> $3
                    )
                    "#,
                )
                .bind(&draft.name)
                .bind(&draft.author)
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(persistence)?;
                if taken {
                    return Err(LibraryError::AlreadyExists(Entity::Book));
                }
            }

            sqlx::query(
                r#"
                UPDATE books SET name = $1, description = $2, author = $3, date_writing = $4
                WHERE id = $5
                "#,
            )
            .bind(&draft.name)
            .bind(&draft.description)
            .bind(&draft.author)
            .bind(draft.date_writing)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(conflict_or_persistence(Entity::Book))?;

            tx.commit().await.map_err(persistence)
        })
        .await
    }

    async fn delete_book(&self, id: &str) -> Result<()> {
        let id = parse_id(id)?;
        self.timed(async {
            let result = sqlx::query("UPDATE books SET deleted = TRUE WHERE id = $1 AND NOT deleted")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(persistence)?;

            if result.rows_affected() == 0 {
                return Err(LibraryError::NotFound(Entity::Book));
            }
            Ok(())
        })
        .await
    }

    async fn purge_deleted_books(&self) -> Result<u64> {
        self.timed(async {
            let mut tx = self.pool.begin().await.map_err(persistence)?;

            let result = sqlx::query("DELETE FROM books WHERE deleted")
                .execute(&mut *tx)
                .await
                .map_err(persistence)?;

            // Dropping an uncommitted transaction rolls it back
            tx.commit().await.map_err(persistence)?;
            Ok(result.rows_affected())
        })
        .await
    }
}

impl Repository for PgStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Postgres
    }
}

// Helper structs for sqlx query_as
#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    password: String,
    email: String,
    age: i32,
    date_registration: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: r.id,
            name: r.name,
            password: r.password,
            email: r.email,
            age: r.age,
            date_registration: r.date_registration,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BookRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    author: String,
    date_writing: Option<NaiveDate>,
    deleted: bool,
}

impl From<BookRow> for Book {
    fn from(r: BookRow) -> Self {
        Book {
            id: r.id,
            name: r.name,
            description: r.description,
            author: r.author,
            date_writing: r.date_writing,
            deleted: r.deleted,
        }
    }
}
