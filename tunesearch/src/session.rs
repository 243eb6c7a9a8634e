use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use tuneclient::{SearchClient, Track};

/// Holds the currently displayed result set. A search replaces the set only
/// at completion, and only if no newer search has started since. The
/// in-flight request is owned by the `search` call for its whole duration;
/// there is no cancellation channel, a superseded search simply has its
/// result discarded whenever it arrives.
pub struct SearchSession {
    client: Arc<SearchClient>,
    seq: AtomicU64,
    tracks: Mutex<Vec<Track>>,
}

impl SearchSession {
    pub fn new(client: Arc<SearchClient>) -> Arc<Self> {
        Arc::new(Self {
            client,
            seq: AtomicU64::new(0),
            tracks: Mutex::new(Vec::new()),
        })
    }

    /// Snapshot of the displayed result set.
    pub fn tracks(&self) -> Vec<Track> {
        self.tracks.lock().unwrap().clone()
    }

    /// Returns true if this search's results are now displayed. A failed or
    /// superseded search leaves the current set untouched.
    pub async fn search(&self, term: &str) -> bool {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let request = self.client.track_search(term);
        let result = request.load().await;

        let mut tracks = self.tracks.lock().unwrap();
        if self.seq.load(Ordering::SeqCst) != seq {
            tracing::debug!(term, "superseded search discarded");
            return false;
        }
        match result {
            Some(new_tracks) => {
                tracing::debug!(term, count = new_tracks.len(), "search results applied");
                *tracks = new_tracks;
                true
            }
            None => {
                tracing::debug!(term, "search returned no results");
                false
            }
        }
    }
}
