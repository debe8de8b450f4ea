/*!
 * Per-user pronoun storage with a write-behind cache.
 *
 * `UserPronounStore` owns the ordered list of pronoun set identifiers for
 * each user. Writes land in the cache immediately and are persisted by a
 * single background worker. Reads are served from the cache and fall back to
 * one backing-store query on a miss.
 *
 * Writes for every user share one FIFO queue, so two replace sequences for
 * the same user can never interleave, and the durable state converges to the
 * last value written to the cache. A miss for a user with no queued writes
 * reads through its own pooled connection; a miss for a user with queued
 * writes is queued behind them so it observes them.
 */

use log::{error, info, warn};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::app_config::StorageConfig;
use crate::database::{DatabaseConnection, Repository};
use crate::errors::StoreError;

pub mod cache;
mod worker;

pub use cache::{Lookup, PronounCache};
use worker::{Completion, StoreOp};

#[derive(Default)]
pub(crate) struct Counters {
    store_reads: AtomicU64,
    writes_completed: AtomicU64,
    write_failures: AtomicU64,
}

/// Operability counters for the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStats {
    /// Reads answered from the cache
    pub cache_hits: u64,
    /// Reads that missed the cache
    pub cache_misses: u64,
    /// Backing-store reads performed for cache misses
    pub store_reads: u64,
    /// Background writes and clears that succeeded
    pub writes_completed: u64,
    /// Background writes and clears that failed
    pub write_failures: u64,
}

/// Completion handle for a queued write
///
/// Dropping it does not cancel the write.
#[must_use = "use `set` or `clear` if durability confirmation is not needed"]
pub struct PendingWrite {
    done: oneshot::Receiver<Result<(), StoreError>>,
}

impl PendingWrite {
    /// Wait until the write has reached the backing store
    pub async fn wait(self) -> Result<(), StoreError> {
        self.done.await.map_err(|_| StoreError::WorkerStopped)?
    }
}

/// Ordered per-user pronoun store
pub struct UserPronounStore {
    cache: Arc<PronounCache>,
    ops: mpsc::UnboundedSender<StoreOp>,
    repository: Repository,
    counters: Arc<Counters>,
}

impl UserPronounStore {
    /// Open the store described by `config`
    ///
    /// Connects, creates or migrates the table and starts the writer. Must be
    /// called from within a tokio runtime.
    pub fn open(config: &StorageConfig) -> Result<Self, StoreError> {
        let handle = current_runtime()?;
        let db = DatabaseConnection::new(&config.database_path, config.pool_size).map_err(|e| {
            error!("Failed to open pronoun storage at {:?}: {:#}", config.database_path, e);
            StoreError::Initialization(format!("{:#}", e))
        })?;

        info!("Connected to pronoun storage at {:?}", config.database_path);
        Ok(Self::start(Repository::new(db), &handle))
    }

    /// Open a store over a fresh in-memory database (for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        let handle = current_runtime()?;
        let repository =
            Repository::new_in_memory().map_err(|e| StoreError::Initialization(format!("{:#}", e)))?;
        Ok(Self::start(repository, &handle))
    }

    /// Build a store over an existing repository
    pub fn with_repository(repository: Repository) -> Result<Self, StoreError> {
        let handle = current_runtime()?;
        Ok(Self::start(repository, &handle))
    }

    fn start(repository: Repository, handle: &Handle) -> Self {
        let (ops, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        let cache = Arc::new(PronounCache::new());
        handle.spawn(worker::run(
            rx,
            repository.clone(),
            Arc::clone(&counters),
            Arc::clone(&cache),
        ));

        Self {
            cache,
            ops,
            repository,
            counters,
        }
    }

    /// Get a user's pronoun identifiers in priority order
    ///
    /// A user with no preference yields an empty sequence. A backing-store
    /// failure on a cache miss yields `StoreError::Unavailable`.
    pub async fn get(&self, user: Uuid) -> Result<Vec<String>, StoreError> {
        let ticket = match self.cache.lookup(&user) {
            Lookup::Hit(sets) => return Ok(sets),
            Lookup::Miss(ticket) => ticket,
        };
        self.counters.store_reads.fetch_add(1, Ordering::Relaxed);

        let sets = if ticket.writes_pending() {
            let (reply, response) = oneshot::channel();
            self.ops
                .send(StoreOp::Load { user, reply })
                .map_err(|_| StoreError::WorkerStopped)?;
            response.await.map_err(|_| StoreError::WorkerStopped)??
        } else {
            self.repository.load_pronouns(user).await.map_err(|e| {
                error!("Error getting pronouns for {}: {:#}", user, e);
                StoreError::Unavailable(format!("{:#}", e))
            })?
        };

        Ok(self.cache.fill(ticket, sets))
    }

    /// Peek at the cache without ever touching the backing store
    pub fn get_cached(&self, user: Uuid) -> Option<Vec<String>> {
        self.cache.peek(&user)
    }

    /// Replace a user's sequence
    ///
    /// The cache is updated before this returns. Persistence happens in the
    /// background and failures are only logged.
    pub fn set(&self, user: Uuid, sets: Vec<String>) {
        self.queue_replace(user, sets, None);
    }

    /// Like `set`, returning a handle that resolves once the write is durable
    pub fn set_confirmed(&self, user: Uuid, sets: Vec<String>) -> PendingWrite {
        let (done, pending) = pending_write();
        self.queue_replace(user, sets, Some(done));
        pending
    }

    fn queue_replace(&self, user: Uuid, sets: Vec<String>, done: Option<Completion>) {
        let queued = sets.clone();
        self.cache.write_then(user, sets, || {
            self.enqueue(StoreOp::Replace {
                user,
                sets: queued,
                done,
            })
        });
    }

    /// Delete a user's rows in the background
    ///
    /// The cache is left as is; pair with `on_disconnect` to drop it too.
    pub fn clear(&self, user: Uuid) {
        self.cache
            .record_write_then(user, || self.enqueue(StoreOp::Clear { user, done: None }));
    }

    /// Like `clear`, returning a handle that resolves once the rows are gone
    pub fn clear_confirmed(&self, user: Uuid) -> PendingWrite {
        let (done, pending) = pending_write();
        self.cache.record_write_then(user, || {
            self.enqueue(StoreOp::Clear {
                user,
                done: Some(done),
            })
        });
        pending
    }

    /// Forget a user's cached entry without touching the backing store
    pub fn on_disconnect(&self, user: Uuid) {
        self.cache.evict(&user);
    }

    /// Scan the backing store, bypassing the cache
    ///
    /// Rows with a malformed user id are skipped. Repeated identifiers for the
    /// same user keep their first (lowest priority) position.
    pub async fn get_all(&self) -> Result<BTreeMap<Uuid, Vec<String>>, StoreError> {
        let records = self.repository.load_all().await.map_err(|e| {
            error!("Error getting pronouns from storage: {:#}", e);
            StoreError::Unavailable(format!("{:#}", e))
        })?;

        let mut all: BTreeMap<Uuid, Vec<String>> = BTreeMap::new();
        for record in records {
            let user = match Uuid::parse_str(&record.player_uuid) {
                Ok(user) => user,
                Err(_) => {
                    warn!("Skipping pronoun row with invalid user id {:?}", record.player_uuid);
                    continue;
                }
            };
            let sets = all.entry(user).or_default();
            if !sets.contains(&record.pronouns) {
                sets.push(record.pronouns);
            }
        }

        Ok(all)
    }

    /// Wait for every operation queued so far to finish
    pub async fn flush(&self) -> Result<(), StoreError> {
        let (done, flushed) = oneshot::channel();
        self.ops
            .send(StoreOp::Flush { done })
            .map_err(|_| StoreError::WorkerStopped)?;
        flushed.await.map_err(|_| StoreError::WorkerStopped)
    }

    /// Snapshot the operability counters
    pub fn stats(&self) -> StoreStats {
        let (cache_hits, cache_misses) = self.cache.stats();
        StoreStats {
            cache_hits,
            cache_misses,
            store_reads: self.counters.store_reads.load(Ordering::Relaxed),
            writes_completed: self.counters.writes_completed.load(Ordering::Relaxed),
            write_failures: self.counters.write_failures.load(Ordering::Relaxed),
        }
    }

    /// Number of users currently cached
    pub fn cached_users(&self) -> usize {
        self.cache.len()
    }

    fn enqueue(&self, op: StoreOp) {
        if self.ops.send(op).is_err() {
            self.counters.write_failures.fetch_add(1, Ordering::Relaxed);
            error!("Pronoun store worker has stopped; write dropped");
        }
    }
}

fn current_runtime() -> Result<Handle, StoreError> {
    Handle::try_current().map_err(|e| {
        StoreError::Initialization(format!("pronoun storage needs a tokio runtime: {}", e))
    })
}

fn pending_write() -> (Completion, PendingWrite) {
    let (done, rx) = oneshot::channel();
    (done, PendingWrite { done: rx })
}
