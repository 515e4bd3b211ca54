//! Background sweeper reclaiming expired cache entries.
//!
//! Lookups never depend on the sweeper: expiry is enforced on read. The
//! sweeper only bounds memory held by entries that are never read again.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use super::ttl_cache::TtlCache;

/// A cache that can drop its expired entries on demand.
pub trait Purgeable: Send + Sync + 'static {
    /// Name used in sweep logs.
    fn name(&self) -> &'static str;

    /// Drops expired entries, returning how many were removed.
    fn purge_expired(&self) -> usize;
}

/// A [`TtlCache`] paired with the name it is logged under.
pub struct NamedCache<K: Eq + Hash, V> {
    name: &'static str,
    cache: Arc<TtlCache<K, V>>,
}

impl<K: Eq + Hash, V> NamedCache<K, V> {
    pub fn new(name: &'static str, cache: Arc<TtlCache<K, V>>) -> Self {
        Self { name, cache }
    }
}

impl<K, V> Purgeable for NamedCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn purge_expired(&self) -> usize {
        self.cache.purge_expired()
    }
}

// ---------------------------------------------------------------------------
// CacheSweeper
// ---------------------------------------------------------------------------

/// Periodically purges every registered cache until stopped.
pub struct CacheSweeper {
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CacheSweeper {
    /// Spawns the sweep loop on the current tokio runtime.
    ///
    /// The first sweep happens one `interval` after start.
    #[must_use]
    pub fn start(caches: Vec<Arc<dyn Purgeable>>, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // Skip the immediate first tick.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        for cache in &caches {
                            let purged = cache.purge_expired();
                            if purged > 0 {
                                debug!(cache = cache.name(), purged, "swept expired entries");
                            }
                        }
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Stops the loop and waits for it to exit.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}
