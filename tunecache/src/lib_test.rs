use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use tokio::sync::Semaphore;
use tuneclient::{DecodeError, Transport, TransportError};

use crate::{AssetCache, AssetDecoder};

#[derive(Clone, Debug, PartialEq)]
struct TextAsset(String);

struct TextDecoder;

impl AssetDecoder for TextDecoder {
    type Asset = TextAsset;

    fn decode(&self, bytes: Bytes) -> Result<TextAsset, DecodeError> {
        let s = std::str::from_utf8(&bytes).map_err(|_| DecodeError::Unrecognized("not utf-8"))?;
        Ok(TextAsset(s.to_uppercase()))
    }
}

/// Stub transport with a per-call gate. With `gated: true` every fetch
/// blocks until the test adds a permit, which makes coalescing windows
/// deterministic without sleeping.
struct GatedTransport {
    responses: Mutex<HashMap<String, Result<Bytes, StatusCode>>>,
    gate: Semaphore,
    fetch_count: AtomicUsize,
}

impl GatedTransport {
    fn new(gated: bool) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(HashMap::new()),
            gate: Semaphore::new(if gated { 0 } else { Semaphore::MAX_PERMITS }),
            fetch_count: AtomicUsize::new(0),
        })
    }

    fn put(&self, url: &str, body: Bytes) {
        self.responses.lock().unwrap().insert(url.to_string(), Ok(body));
    }

    fn fail(&self, url: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Err(StatusCode::BAD_GATEWAY));
    }

    async fn fetch_started(&self) {
        while self.fetch_count.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl Transport for GatedTransport {
    async fn fetch(&self, url: &str) -> Result<Bytes, TransportError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.gate.acquire().await.unwrap().forget();
        match self.responses.lock().unwrap().get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(TransportError::Status(*status)),
            None => Err(TransportError::Status(StatusCode::NOT_FOUND)),
        }
    }
}

async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn concurrent_obtains_share_one_fetch() {
    let transport = GatedTransport::new(true);
    transport.put("k", Bytes::from_static(b"body"));
    let cache = AssetCache::new(transport.clone(), TextDecoder, None);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.obtain("k").await })
        })
        .collect();

    transport.fetch_started().await;
    settle().await;
    assert_eq!(transport.fetch_count.load(Ordering::SeqCst), 1);

    transport.gate.add_permits(1);
    for handle in handles {
        assert_eq!(handle.await.unwrap(), Some(TextAsset("BODY".into())));
    }
    assert_eq!(transport.fetch_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn ready_key_resolves_without_refetch() {
    let transport = GatedTransport::new(false);
    transport.put("k", Bytes::from_static(b"body"));
    let cache = AssetCache::new(transport.clone(), TextDecoder, None);

    assert_eq!(cache.obtain("k").await, Some(TextAsset("BODY".into())));
    assert_eq!(cache.obtain("k").await, Some(TextAsset("BODY".into())));
    assert_eq!(transport.fetch_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_fetch_resolves_all_waiters_and_stays_retryable() {
    let transport = GatedTransport::new(true);
    transport.fail("k");
    let cache = AssetCache::new(transport.clone(), TextDecoder, None);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.obtain("k").await })
        })
        .collect();

    transport.fetch_started().await;
    settle().await;
    transport.gate.add_permits(1);
    for handle in handles {
        assert_eq!(handle.await.unwrap(), None);
    }
    assert_eq!(transport.fetch_count.load(Ordering::SeqCst), 1);

    // The key was not poisoned: a later obtain starts over and succeeds.
    transport.put("k", Bytes::from_static(b"body"));
    transport.gate.add_permits(1);
    assert_eq!(cache.obtain("k").await, Some(TextAsset("BODY".into())));
    assert_eq!(transport.fetch_count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn keys_resolve_independently() {
    let transport = GatedTransport::new(false);
    transport.fail("a");
    transport.put("b", Bytes::from_static(b"beta"));
    let cache = AssetCache::new(transport.clone(), TextDecoder, None);

    let (a, b) = tokio::join!(cache.obtain("a"), cache.obtain("b"));
    assert_eq!(a, None);
    assert_eq!(b, Some(TextAsset("BETA".into())));
    assert_eq!(transport.fetch_count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn rapid_obtains_dedup_to_one_fetch() {
    let transport = GatedTransport::new(true);
    transport.put("k", Bytes::from_static(b"body"));
    let cache = AssetCache::new(transport.clone(), TextDecoder, None);

    let handles: Vec<_> = (0..1000)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.obtain("k").await })
        })
        .collect();

    transport.fetch_started().await;
    settle().await;
    transport.gate.add_permits(1);
    for handle in handles {
        assert_eq!(handle.await.unwrap(), Some(TextAsset("BODY".into())));
    }
    assert_eq!(transport.fetch_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn decode_failure_behaves_like_fetch_failure() {
    let transport = GatedTransport::new(false);
    transport.put("k", Bytes::from_static(&[0xff, 0xfe, 0x00]));
    let cache = AssetCache::new(transport.clone(), TextDecoder, None);

    assert_eq!(cache.obtain("k").await, None);

    transport.put("k", Bytes::from_static(b"body"));
    assert_eq!(cache.obtain("k").await, Some(TextAsset("BODY".into())));
    assert_eq!(transport.fetch_count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn bounded_cache_still_coalesces() {
    let transport = GatedTransport::new(false);
    transport.put("k", Bytes::from_static(b"body"));
    let cache = AssetCache::new(transport.clone(), TextDecoder, Some(16));

    assert_eq!(cache.obtain("k").await, Some(TextAsset("BODY".into())));
    assert_eq!(cache.obtain("k").await, Some(TextAsset("BODY".into())));
    assert_eq!(transport.fetch_count.load(Ordering::SeqCst), 1);
}
