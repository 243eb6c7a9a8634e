use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use tokio::task::JoinHandle;

use crate::cover::{CoverArt, CoverCache};

/// Fixed pool of reusable display slots. A slot shows one logical row at a
/// time and may be recycled for a different row while a cover fetch for the
/// old row is still outstanding. The token minted at bind time decides
/// whether a completion is still allowed to touch the slot: identity and
/// token live in the pool at the slot's index, never on the completion.
pub struct CoverGrid {
    cache: Arc<CoverCache>,
    slots: Mutex<Vec<Slot>>,
    next_token: AtomicU64,
}

#[derive(Default)]
struct Slot {
    row: Option<usize>,
    token: u64,
    cover: Option<CoverArt>,
}

impl CoverGrid {
    pub fn new(cache: Arc<CoverCache>, slot_count: usize) -> Arc<Self> {
        let mut slots = Vec::new();
        slots.resize_with(slot_count, Slot::default);
        Arc::new(Self {
            cache,
            slots: Mutex::new(slots),
            next_token: AtomicU64::new(1),
        })
    }

    pub fn slot_count(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    pub fn row(&self, slot: usize) -> Option<usize> {
        self.slots.lock().unwrap()[slot].row
    }

    pub fn cover(&self, slot: usize) -> Option<CoverArt> {
        self.slots.lock().unwrap()[slot].cover.clone()
    }

    /// Point `slot` at logical `row` and start loading its cover. The slot's
    /// previous cover is cleared immediately; the fetched cover is applied
    /// only if the slot still shows `row` under this same binding when the
    /// fetch resolves. A stale completion is discarded without touching the
    /// slot.
    pub fn bind(self: &Arc<Self>, slot: usize, row: usize, cover_url: &str) -> JoinHandle<()> {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        {
            let mut slots = self.slots.lock().unwrap();
            let s = &mut slots[slot];
            s.row = Some(row);
            s.token = token;
            s.cover = None;
        }

        let me = self.clone();
        let url = cover_url.to_string();
        tokio::spawn(async move {
            let cover = me.cache.obtain(&url).await;
            let mut slots = me.slots.lock().unwrap();
            let s = &mut slots[slot];
            if s.token != token || s.row != Some(row) {
                tracing::trace!(slot, row, "discarding stale cover");
                return;
            }
            s.cover = cover;
        })
    }

    /// Detach `slot`: any completion still in flight for it becomes a no-op.
    pub fn clear(&self, slot: usize) {
        let mut slots = self.slots.lock().unwrap();
        let s = &mut slots[slot];
        s.row = None;
        s.token = self.next_token.fetch_add(1, Ordering::Relaxed);
        s.cover = None;
    }
}
