mod tracks;


pub use tracks::{Lyrics, LyricsResource, Track, TrackSearchResource};

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("status {0}")]
    Status(StatusCode),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unrecognized payload: {0}")]
    Unrecognized(&'static str),
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Raw network boundary. One GET per call, no retries, no caching.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn fetch(&self, url: &str) -> Result<Bytes, TransportError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client) -> Arc<Self> {
        Arc::new(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<Bytes, TransportError> {
        let res = self.client.get(url).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            tracing::warn!(status = %status, text = %text, url, "request failed");
            return Err(TransportError::Status(status));
        }
        Ok(res.bytes().await?)
    }
}

/// Decoding strategy for one payload kind. Must be pure: no state, no I/O.
pub trait Resource: Send + Sync + 'static {
    type Item: Send + 'static;

    fn decode(&self, bytes: &[u8]) -> Result<Vec<Self::Item>, DecodeError>;
}

/// One typed fetch: a URL plus the strategy that turns the response body
/// into a list of items. Resolves exactly once per `load`/`try_load` call.
pub struct ResourceRequest<R: Resource> {
    transport: Arc<dyn Transport>,
    resource: R,
    url: String,
}

impl<R: Resource> ResourceRequest<R> {
    pub fn new(transport: Arc<dyn Transport>, resource: R, url: String) -> Self {
        Self {
            transport,
            resource,
            url,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn try_load(&self) -> Result<Vec<R::Item>, ResourceError> {
        let bytes = self.transport.fetch(&self.url).await?;
        Ok(self.resource.decode(&bytes)?)
    }

    /// Collapses both failure kinds to `None`. Callers only distinguish
    /// "got data" from "did not"; the error kind is logged here.
    pub async fn load(&self) -> Option<Vec<R::Item>> {
        match self.try_load().await {
            Ok(items) => Some(items),
            Err(e) => {
                tracing::warn!(error = %e, url = %self.url, "resource load failed");
                None
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct SearchClientConfig {
    /// Track search endpoint.
    pub search_endpoint: Url,

    /// Lyrics endpoint. `/{artist}/{title}` is appended per request.
    pub lyrics_endpoint: Url,

    pub media: String,
    pub entity: String,

    /// Maximum number of results to request, if any.
    pub limit: Option<u32>,
}

impl Default for SearchClientConfig {
    fn default() -> Self {
        Self {
            search_endpoint: Url::parse("https://itunes.apple.com/search").unwrap(),
            lyrics_endpoint: Url::parse("https://api.lyrics.ovh/v1").unwrap(),
            media: "music".into(),
            entity: "song".into(),
            limit: None,
        }
    }
}

pub struct SearchClient {
    transport: Arc<dyn Transport>,
    config: SearchClientConfig,
}

impl SearchClient {
    pub fn new(transport: Arc<dyn Transport>, config: SearchClientConfig) -> Arc<Self> {
        Arc::new(Self { transport, config })
    }

    pub fn config(&self) -> &SearchClientConfig {
        &self.config
    }

    pub fn track_search(&self, term: &str) -> ResourceRequest<TrackSearchResource> {
        let mut url = self.config.search_endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("media", &self.config.media);
            query.append_pair("entity", &self.config.entity);
            query.append_pair("term", term);
            if let Some(limit) = self.config.limit {
                query.append_pair("limit", &limit.to_string());
            }
        }
        ResourceRequest::new(self.transport.clone(), TrackSearchResource, url.into())
    }

    pub fn track_lyrics(&self, artist: &str, title: &str) -> ResourceRequest<LyricsResource> {
        let mut url = self.config.lyrics_endpoint.clone();
        url.path_segments_mut().unwrap().push(artist).push(title);
        ResourceRequest::new(self.transport.clone(), LyricsResource, url.into())
    }
}
