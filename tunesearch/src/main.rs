mod cover;
mod grid;
mod session;


use std::sync::Arc;

use anyhow::{Context, Result};
use structopt::StructOpt;
use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};
use tuneclient::{HttpTransport, SearchClient, SearchClientConfig};
use tunecache::AssetCache;

use cover::{CoverArtDecoder, CoverCache};
use grid::CoverGrid;
use session::SearchSession;

#[derive(Debug, StructOpt)]
#[structopt(name = "tunesearch", about = "search tracks and fetch cover art")]
struct Opt {
    /// Search term.
    term: String,

    /// Maximum number of results to request.
    #[structopt(long, default_value = "25")]
    limit: u32,

    /// Also fetch lyrics for this result row (zero-based).
    #[structopt(long)]
    lyrics: Option<usize>,

    /// Maximum number of cached covers. Unbounded when not set.
    #[structopt(long)]
    cover_capacity: Option<u64>,

    /// Output log in JSON format.
    #[structopt(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::from_args();

    if opt.json {
        SubscriberBuilder::default()
            .with_env_filter(EnvFilter::from_default_env())
            .json()
            .init();
    } else {
        SubscriberBuilder::default()
            .with_env_filter(EnvFilter::from_default_env())
            .pretty()
            .init();
    }

    let transport = HttpTransport::new(reqwest::Client::new());
    let client = SearchClient::new(
        transport.clone(),
        SearchClientConfig {
            limit: Some(opt.limit),
            ..SearchClientConfig::default()
        },
    );
    let session = SearchSession::new(client.clone());

    if !session.search(&opt.term).await {
        anyhow::bail!("no results for {:?}", opt.term);
    }
    let tracks = session.tracks();
    tracing::info!(count = tracks.len(), "search finished");

    let cache: Arc<CoverCache> = AssetCache::new(transport, CoverArtDecoder, opt.cover_capacity);
    let grid = CoverGrid::new(cache, tracks.len());
    let mut loads = Vec::new();
    for (row, track) in tracks.iter().enumerate() {
        if let Some(cover_url) = &track.cover_url {
            loads.push(grid.bind(row, row, cover_url));
        }
    }
    for load in loads {
        load.await?;
    }

    for (row, track) in tracks.iter().enumerate() {
        let cover = match grid.cover(row) {
            Some(cover) => format!("{} ({} bytes)", cover.format.as_str(), cover.bytes.len()),
            None => "-".to_string(),
        };
        println!(
            "{:>3}. {} — {} [{}] cover: {}",
            row + 1,
            track.name.as_deref().unwrap_or("?"),
            track.artist.as_deref().unwrap_or("?"),
            track.album.as_deref().unwrap_or("?"),
            cover,
        );
    }

    if let Some(row) = opt.lyrics {
        let track = tracks
            .get(row)
            .with_context(|| format!("no result row {}", row))?;
        match (&track.artist, &track.name) {
            (Some(artist), Some(name)) => {
                let request = client.track_lyrics(artist, name);
                match request.load().await.and_then(|mut l| l.pop()) {
                    Some(lyrics) => {
                        println!("\n{} — {}\n\n{}", artist, name, lyrics.lyrics);
                    }
                    None => println!("\nno lyrics found for row {}", row),
                }
            }
            _ => anyhow::bail!("row {} has no artist/title for a lyrics lookup", row),
        }
    }

    Ok(())
}
