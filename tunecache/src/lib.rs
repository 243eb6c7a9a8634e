mod asset_cache;

#[cfg(test)]
mod lib_test;

pub use asset_cache::AssetCache;

use bytes::Bytes;
use tuneclient::DecodeError;

/// Decoding step applied to fetched bytes before they enter the cache.
/// Must be pure and cheap; it runs inline on the fetch task.
pub trait AssetDecoder: Send + Sync + 'static {
    type Asset: Clone + Send + Sync + 'static;

    fn decode(&self, bytes: Bytes) -> Result<Self::Asset, DecodeError>;
}
