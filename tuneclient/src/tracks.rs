use serde::Deserialize;

use crate::{DecodeError, Resource};

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub name: Option<String>,
    pub album: Option<String>,
    pub artist: Option<String>,
    pub cover_url: Option<String>,
    pub preview_url: Option<String>,
}

#[derive(Deserialize)]
struct SearchPayload {
    #[serde(default)]
    results: Vec<RawTrack>,
}

// Field names as the search endpoint spells them.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrack {
    track_name: Option<String>,
    collection_name: Option<String>,
    artist_name: Option<String>,
    artwork_url100: Option<String>,
    preview_url: Option<String>,
}

impl From<RawTrack> for Track {
    fn from(raw: RawTrack) -> Self {
        Self {
            name: raw.track_name,
            album: raw.collection_name,
            artist: raw.artist_name,
            cover_url: raw.artwork_url100,
            preview_url: raw.preview_url,
        }
    }
}

pub struct TrackSearchResource;

impl Resource for TrackSearchResource {
    type Item = Track;

    fn decode(&self, bytes: &[u8]) -> Result<Vec<Track>, DecodeError> {
        let payload: SearchPayload = serde_json::from_slice(bytes)?;
        Ok(payload.results.into_iter().map(Track::from).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Lyrics {
    pub lyrics: String,
}

pub struct LyricsResource;

impl Resource for LyricsResource {
    type Item = Lyrics;

    fn decode(&self, bytes: &[u8]) -> Result<Vec<Lyrics>, DecodeError> {
        let lyrics: Lyrics = serde_json::from_slice(bytes)?;
        Ok(vec![lyrics])
    }
}
