use bytes::Bytes;
use tuneclient::DecodeError;
use tunecache::{AssetCache, AssetDecoder};

pub type CoverCache = AssetCache<CoverArtDecoder>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoverFormat {
    Jpeg,
    Png,
    Gif,
}

impl CoverFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverFormat::Jpeg => "jpeg",
            CoverFormat::Png => "png",
            CoverFormat::Gif => "gif",
        }
    }
}

/// Artwork as the display layer consumes it: the raw bytes plus the sniffed
/// container format. The bytes stay opaque beyond the magic check.
#[derive(Clone, Debug, PartialEq)]
pub struct CoverArt {
    pub format: CoverFormat,
    pub bytes: Bytes,
}

pub struct CoverArtDecoder;

impl AssetDecoder for CoverArtDecoder {
    type Asset = CoverArt;

    fn decode(&self, bytes: Bytes) -> Result<CoverArt, DecodeError> {
        let format =
            sniff_format(&bytes).ok_or(DecodeError::Unrecognized("unknown image container"))?;
        Ok(CoverArt { format, bytes })
    }
}

fn sniff_format(bytes: &[u8]) -> Option<CoverFormat> {
    if bytes.starts_with(&[0xff, 0xd8, 0xff]) {
        Some(CoverFormat::Jpeg)
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some(CoverFormat::Png)
    } else if bytes.starts_with(b"GIF8") {
        Some(CoverFormat::Gif)
    } else {
        None
    }
}
