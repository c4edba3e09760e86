//! Retention sweeper
//!
//! Book deletes only set a flag. Each successful delete bumps a bounded
//! counter; once the counter is full, the next periodic check purges every
//! flagged row in one batch. A failed purge re-arms the counter and the
//! following check waits longer, doubling up to `max_backoff`.

use crate::config::SweeperSettings;
use crate::services::BookService;
use library_core::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Saturating count of deletions since the last purge
pub struct DeletionCounter {
    count: AtomicUsize,
    capacity: usize,
}

impl DeletionCounter {
    pub fn new(capacity: usize) -> Self {
        Self {
            count: AtomicUsize::new(0),
            capacity: capacity.max(1),
        }
    }

    /// Record one deletion; stays at capacity once full
    pub fn record_deletion(&self) {
        let _ = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.capacity).then_some(n + 1)
            });
    }

    pub fn is_full(&self) -> bool {
        self.count.load(Ordering::Acquire) >= self.capacity
    }

    pub fn pending(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    fn drain(&self) -> usize {
        self.count.swap(0, Ordering::AcqRel)
    }

    fn rearm(&self) {
        self.count.store(self.capacity, Ordering::Release);
    }
}

pub struct RetentionSweeper {
    books: Arc<BookService>,
    counter: Arc<DeletionCounter>,
    interval: Duration,
    max_backoff: Duration,
}

impl RetentionSweeper {
    pub fn new(
        books: Arc<BookService>,
        counter: Arc<DeletionCounter>,
        settings: &SweeperSettings,
    ) -> Self {
        Self {
            books,
            counter,
            interval: settings.interval(),
            max_backoff: settings.max_backoff().max(settings.interval()),
        }
    }

    /// Run until `shutdown` is cancelled
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    async fn run(self, shutdown: CancellationToken) {
        info!(
            "Retention sweeper started (interval {:?}, capacity {})",
            self.interval, self.counter.capacity
        );
        let mut failures: u32 = 0;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Retention sweeper stopped");
                    return;
                }
                _ = tokio::time::sleep(self.next_wait(failures)) => {}
            }

            match self.sweep_once().await {
                Ok(Some(removed)) => {
                    info!(removed, "Purged soft-deleted books");
                    failures = 0;
                }
                Ok(None) => {
                    debug!("Sweeper idle ({} pending)", self.counter.pending());
                    failures = 0;
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    error!(
                        "Purge failed (attempt {}), retrying in {:?}: {}",
                        failures,
                        self.next_wait(failures),
                        e
                    );
                }
            }
        }
    }

    /// Purge if the counter is full. `Ok(None)` when there was nothing to do.
    pub async fn sweep_once(&self) -> Result<Option<u64>> {
        if !self.counter.is_full() {
            return Ok(None);
        }

        self.counter.drain();
        match self.books.delete_books().await {
            Ok(removed) => Ok(Some(removed)),
            Err(e) => {
                self.counter.rearm();
                Err(e)
            }
        }
    }

    fn next_wait(&self, failures: u32) -> Duration {
        let factor = 1u32.checked_shl(failures).unwrap_or(u32::MAX);
        self.interval.saturating_mul(factor).min(self.max_backoff)
    }
}
