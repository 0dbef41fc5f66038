//! Offline-first read path over a remote source and a local store

use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::{LocalStore, OfflineRecord, OfflineResult, RemoteSource};

pub struct OfflineCache<T: OfflineRecord> {
    inner: Arc<Inner<T>>,
    background: Mutex<Option<JoinHandle<()>>>,
}

struct Inner<T: OfflineRecord> {
    name: String,
    remote: Arc<dyn RemoteSource<T>>,
    store: Arc<dyn LocalStore<T>>,
    refreshing: AtomicBool,
}

impl<T: OfflineRecord> Inner<T> {
    async fn fetch_and_store(&self) -> OfflineResult<Vec<T>> {
        let records = self.remote.fetch_all().await?;
        self.store.replace_all(&records, Utc::now()).await?;
        tracing::debug!(collection = %self.name, count = records.len(), "Local copy replaced");
        Ok(records)
    }
}

impl<T: OfflineRecord> OfflineCache<T> {
    pub fn new(name: &str, remote: Arc<dyn RemoteSource<T>>, store: Arc<dyn LocalStore<T>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.to_string(),
                remote,
                store,
                refreshing: AtomicBool::new(false),
            }),
            background: Mutex::new(None),
        }
    }

    /// Local records when there are any (refreshing them in the background),
    /// otherwise the remote collection.
    ///
    /// If the remote fails while the local copy looked empty, the local copy
    /// is read once more and returned if something landed there meanwhile.
    pub async fn get_all(&self) -> OfflineResult<Vec<T>> {
        let local = self.inner.store.read_all().await?;
        if !local.is_empty() {
            self.spawn_refresh().await;
            return Ok(local);
        }

        match self.inner.fetch_and_store().await {
            Ok(records) => Ok(records),
            Err(err) => match self.inner.store.read_all().await {
                Ok(fallback) if !fallback.is_empty() => {
                    tracing::warn!(
                        collection = %self.inner.name,
                        "Remote fetch failed, serving local copy: {}",
                        err
                    );
                    Ok(fallback)
                }
                _ => Err(err),
            },
        }
    }

    /// Fetch the remote collection and replace the local copy
    pub async fn refresh(&self) -> OfflineResult<usize> {
        Ok(self.inner.fetch_and_store().await?.len())
    }

    /// Wait for the background refresh started by `get_all`, if any
    pub async fn wait_for_refresh(&self) {
        let handle = self.background.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(collection = %self.inner.name, "Background refresh task failed: {}", e);
            }
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.refreshing.load(Ordering::Acquire)
    }

    async fn spawn_refresh(&self) {
        // Held across the flag check and the store so a newer task's handle
        // is never overwritten by an older one.
        let mut background = self.background.lock().await;
        if self
            .inner
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let inner = Arc::clone(&self.inner);
        *background = Some(tokio::spawn(async move {
            let _refreshing = RefreshingGuard(&inner.refreshing);
            if let Err(e) = inner.fetch_and_store().await {
                tracing::warn!(collection = %inner.name, "Background refresh failed: {}", e);
            }
        }));
    }
}

/// Clears the in-flight flag when the refresh task ends, including by panic
struct RefreshingGuard<'a>(&'a AtomicBool);

impl Drop for RefreshingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
