use std::{
    collections::{hash_map::Entry, HashMap},
    sync::{Arc, Mutex},
};

use tokio::sync::oneshot;
use tuneclient::Transport;

use crate::AssetDecoder;

type Waiter<T> = oneshot::Sender<Option<T>>;

/// Keyed asset cache that coalesces concurrent fetches. The key is the asset
/// URL; a key is fetched at most once no matter how many callers ask for it
/// while the fetch is outstanding. The fetch itself is owned by the cache,
/// not by any caller, so caller cancellation cannot strand other waiters.
pub struct AssetCache<D: AssetDecoder> {
    transport: Arc<dyn Transport>,
    decoder: D,
    ready: moka::sync::Cache<String, D::Asset>,
    pending: Mutex<HashMap<String, Vec<Waiter<D::Asset>>>>,
}

impl<D: AssetDecoder> AssetCache<D> {
    /// `capacity` bounds the number of ready assets kept; `None` keeps all.
    pub fn new(transport: Arc<dyn Transport>, decoder: D, capacity: Option<u64>) -> Arc<Self> {
        let mut ready = moka::sync::Cache::builder();
        if let Some(capacity) = capacity {
            ready = ready.max_capacity(capacity);
        }
        Arc::new(Self {
            transport,
            decoder,
            ready: ready.build(),
            pending: Mutex::new(HashMap::new()),
        })
    }

    /// Resolves with the asset for `key`. A ready key resolves immediately;
    /// a pending key attaches this caller to the in-flight fetch; an unknown
    /// key starts exactly one fetch. Resolves with `None` if this round's
    /// fetch or decode failed; the key stays retryable.
    pub async fn obtain(self: &Arc<Self>, key: &str) -> Option<D::Asset> {
        if let Some(asset) = self.ready.get(key) {
            return Some(asset);
        }

        let rx = {
            let mut pending = self.pending.lock().unwrap();
            // A fetch may have published between the unlocked check and here.
            if let Some(asset) = self.ready.get(key) {
                return Some(asset);
            }
            let (tx, rx) = oneshot::channel();
            match pending.entry(key.to_string()) {
                Entry::Occupied(mut entry) => {
                    entry.get_mut().push(tx);
                }
                Entry::Vacant(entry) => {
                    entry.insert(vec![tx]);
                    tokio::spawn(self.clone().fetch(key.to_string()));
                }
            }
            rx
        };

        rx.await.ok().flatten()
    }

    async fn fetch(self: Arc<Self>, key: String) {
        let asset = match self.transport.fetch(&key).await {
            Ok(bytes) => match self.decoder.decode(bytes) {
                Ok(asset) => Some(asset),
                Err(e) => {
                    tracing::warn!(error = %e, key, "asset decode failed");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, key, "asset fetch failed");
                None
            }
        };

        let waiters = {
            let mut pending = self.pending.lock().unwrap();
            if let Some(asset) = &asset {
                // Must be visible before the pending entry goes away; a
                // concurrent obtain must never see neither.
                self.ready.insert(key.clone(), asset.clone());
            }
            // On failure the entry is simply removed: the next obtain for
            // this key starts a fresh fetch.
            pending.remove(&key).unwrap_or_default()
        };

        // Attachment order.
        for tx in waiters {
            let _ = tx.send(asset.clone());
        }
    }
}
