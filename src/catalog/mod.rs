/*!
 * Locally cached snapshot of the community pronoun catalog.
 *
 * `RemoteCatalogCache` keeps the last catalog document fetched from the
 * remote service in a local file and an in-memory snapshot. Network and file
 * failures are logged and never reach callers: the catalog simply looks
 * empty or stale.
 */

use log::{debug, info, warn};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::app_config::CatalogConfig;
use crate::errors::CatalogError;
use crate::pronoun_set::PronounSet;

pub mod client;
pub mod mock;
pub mod snapshot;

pub use client::{CatalogClient, HttpCatalogClient, SubmitRequest};
pub use snapshot::CatalogSnapshot;

/// Operability counters for the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CatalogStats {
    /// Successful fetches written to the cache file
    pub refreshes: u64,
    /// Fetches that failed or returned an unusable document
    pub refresh_failures: u64,
    /// Submissions attempted
    pub submissions: u64,
    /// Submissions rejected or not delivered
    pub submission_failures: u64,
}

#[derive(Default)]
struct Counters {
    refreshes: AtomicU64,
    refresh_failures: AtomicU64,
    submissions: AtomicU64,
    submission_failures: AtomicU64,
}

/// Best-effort read-through cache of the remote catalog
pub struct RemoteCatalogCache {
    client: Arc<dyn CatalogClient>,
    cache_file: PathBuf,
    sync_enabled: bool,
    source_tag: String,
    snapshot: RwLock<Option<CatalogSnapshot>>,
    counters: Counters,
}

impl RemoteCatalogCache {
    /// Create a cache with nothing loaded yet
    pub fn new(config: &CatalogConfig, client: Arc<dyn CatalogClient>) -> Self {
        Self {
            client,
            cache_file: config.cache_file.clone(),
            sync_enabled: config.sync_enabled,
            source_tag: config.source_tag(),
            snapshot: RwLock::new(None),
            counters: Counters::default(),
        }
    }

    /// Create a cache and perform the initial fetch
    ///
    /// If the fetch does not produce a snapshot (sync disabled or offline),
    /// whatever is in the local file is loaded instead.
    pub async fn open(config: &CatalogConfig, client: Arc<dyn CatalogClient>) -> Self {
        let cache = Self::new(config, client);
        cache.update().await;
        if cache.snapshot.read().is_none() {
            cache.reload().await;
        }
        cache
    }

    /// Like `open`, talking to the configured endpoint over HTTP
    pub async fn open_http(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let client = HttpCatalogClient::from_config(config)?;
        Ok(Self::open(config, Arc::new(client)).await)
    }

    /// Fetch the catalog, store it locally and reload from the file
    ///
    /// Does nothing when sync is disabled. On failure the loaded snapshot is
    /// left untouched.
    pub async fn update(&self) {
        self.refresh().await;
    }

    /// Returns whether a fresh document was stored and loaded
    async fn refresh(&self) -> bool {
        if !self.sync_enabled {
            debug!("Catalog sync is disabled, not updating");
            return false;
        }

        info!("Updating the pronoun catalog...");
        match self.fetch_to_file().await {
            Ok(()) => {
                self.counters.refreshes.fetch_add(1, Ordering::Relaxed);
                info!("Successfully updated the pronoun catalog.");
                self.load_from_file().await;
                true
            }
            Err(e) => {
                self.counters.refresh_failures.fetch_add(1, Ordering::Relaxed);
                warn!("There was an issue trying to update the pronoun catalog: {}", e);
                false
            }
        }
    }

    async fn fetch_to_file(&self) -> Result<(), CatalogError> {
        let body = self.client.fetch().await?;
        // Never replace a good file with something unreadable
        CatalogSnapshot::from_json(&body)?;

        let path = self.cache_file.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, body.as_bytes()))
            .await
            .map_err(|e| CatalogError::Io(std::io::Error::other(e)))?
    }

    /// Load the snapshot from the local file
    ///
    /// A missing file triggers a fetch first. An unreadable or corrupt file
    /// keeps the previous snapshot; the error-marker snapshot is only used
    /// when nothing has been loaded before.
    pub async fn reload(&self) {
        if !tokio::fs::try_exists(&self.cache_file).await.unwrap_or(false)
            && self.refresh().await
        {
            return;
        }
        self.load_from_file().await;
    }

    async fn load_from_file(&self) {
        let loaded = match tokio::fs::read_to_string(&self.cache_file).await {
            Ok(text) => CatalogSnapshot::from_json(&text),
            Err(e) => Err(CatalogError::Io(e)),
        };

        match loaded {
            Ok(snapshot) => {
                debug!(
                    "Loaded {} pronoun sets from {:?} (source: {})",
                    snapshot.sets.len(),
                    self.cache_file,
                    snapshot.source
                );
                *self.snapshot.write() = Some(snapshot);
            }
            Err(e) => {
                warn!("Failed to read from the catalog cache file {:?}: {}", self.cache_file, e);
                let mut current = self.snapshot.write();
                match current.as_ref() {
                    Some(previous) if !previous.is_fallback() => {
                        warn!("Keeping the previously loaded catalog ({} sets)", previous.sets.len());
                    }
                    _ => *current = Some(CatalogSnapshot::fallback()),
                }
            }
        }
    }

    /// Known pronoun sets, empty if nothing has loaded
    pub fn get(&self) -> BTreeSet<PronounSet> {
        self.snapshot
            .read()
            .as_ref()
            .map(|snapshot| snapshot.sets.clone())
            .unwrap_or_default()
    }

    /// The whole current snapshot
    pub fn snapshot(&self) -> Option<CatalogSnapshot> {
        self.snapshot.read().clone()
    }

    /// Submit a set to the catalog service
    ///
    /// Failures are logged; there is no retry. The sync switch only governs
    /// `update`, so callers decide whether to submit.
    pub async fn submit(&self, set: &PronounSet) {
        let request = SubmitRequest {
            set: set.to_string(),
            source: self.source_tag.clone(),
        };
        self.counters.submissions.fetch_add(1, Ordering::Relaxed);

        match self.client.submit(&request).await {
            Ok(()) => info!("Submitted {} to the pronoun catalog", set),
            Err(e) => {
                self.counters.submission_failures.fetch_add(1, Ordering::Relaxed);
                warn!("There was an error submitting a set to the pronoun catalog: {}", e);
            }
        }
    }

    /// Snapshot the operability counters
    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            refreshes: self.counters.refreshes.load(Ordering::Relaxed),
            refresh_failures: self.counters.refresh_failures.load(Ordering::Relaxed),
            submissions: self.counters.submissions.load(Ordering::Relaxed),
            submission_failures: self.counters.submission_failures.load(Ordering::Relaxed),
        }
    }

    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    pub fn is_sync_enabled(&self) -> bool {
        self.sync_enabled
    }
}

/// Replace `path` with `contents` through a temp file in the same directory
fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), CatalogError> {
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            dir.to_path_buf()
        }
        None => PathBuf::from("."),
    };

    let mut file = tempfile::NamedTempFile::new_in(&dir)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| CatalogError::Io(e.error))?;
    Ok(())
}
