//! Storage layer
//!
//! PostgreSQL when the database is reachable at startup, otherwise an
//! in-process store that lives as long as the server does.

pub mod db;
pub mod memory;

pub use db::PgStore;
pub use memory::MemoryStore;

use crate::config::DatabaseSettings;
use library_core::ports::Repository;
use std::sync::Arc;
use tracing::{info, warn};

/// The repository chosen at startup, plus the pool handle when there is one
pub struct Backend {
    pub repository: Arc<dyn Repository>,
    pub postgres: Option<Arc<PgStore>>,
}

/// Open the persistent backend, falling back to memory on any failure.
/// The choice is made once; there is no reconnection later.
pub async fn open_backend(settings: &DatabaseSettings) -> Backend {
    let attempt = tokio::time::timeout(settings.startup_timeout(), PgStore::connect(settings)).await;

    let failure = match attempt {
        Ok(Ok(store)) => {
            info!("Using PostgreSQL storage");
            let store = Arc::new(store);
            return Backend {
                repository: store.clone(),
                postgres: Some(store),
            };
        }
        Ok(Err(e)) => format!("{:#}", e),
        Err(_) => format!(
            "connection timed out after {}s",
            settings.startup_timeout_secs
        ),
    };

    warn!(
        "PostgreSQL unavailable ({}), falling back to in-memory storage",
        failure
    );
    Backend {
        repository: Arc::new(MemoryStore::new()),
        postgres: None,
    }
}
