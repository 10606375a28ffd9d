//! Decoded-raster cache in front of the layer store.
//!
//! Entries are never the source of truth. Writers must [`RasterCache::invalidate`] a
//! layer after storing it. Readers take a [`RasterCache::stamp`] before fetching from
//! the store and hand it back to [`RasterCache::insert`], which refuses the raster if
//! any invalidation happened in between. So a cached raster is always equal to the
//! decode of the current stored blob, or absent, even with reads in flight during a write.

use std::sync::Arc;

use crate::raster::Raster;
use crate::state::LayerID;

struct Entry {
    raster: Arc<Raster>,
    last_used: u64,
}

/// Bounded by entry count, evicting the least recently used.
pub struct RasterCache {
    capacity: usize,
    /// Monotonic use counter, for recency.
    tick: u64,
    /// Bumped by every invalidation.
    epoch: u64,
    entries: hashbrown::HashMap<LayerID, Entry>,
}
impl RasterCache {
    /// A capacity of zero caches nothing.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            tick: 0,
            epoch: 0,
            entries: hashbrown::HashMap::with_capacity(capacity),
        }
    }
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    fn bump(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
    pub fn get(&mut self, id: LayerID) -> Option<Arc<Raster>> {
        let tick = self.bump();
        let entry = self.entries.get_mut(&id)?;
        entry.last_used = tick;
        Some(entry.raster.clone())
    }
    /// Take before reading a layer from the store, to pass to [`RasterCache::insert`].
    #[must_use]
    pub fn stamp(&self) -> u64 {
        self.epoch
    }
    /// Cache a raster read from the store after `stamp` was taken.
    /// Returns `false` if it was refused because a write may have superseded it.
    pub fn insert(&mut self, id: LayerID, raster: Arc<Raster>, stamp: u64) -> bool {
        if stamp != self.epoch {
            log::debug!("not caching {id}, invalidated while it was being read");
            return false;
        }
        if self.capacity == 0 {
            return false;
        }
        let last_used = self.bump();
        if !self.entries.contains_key(&id) {
            while self.entries.len() >= self.capacity {
                let Some(oldest) = self
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_used)
                    .map(|(id, _)| *id)
                else {
                    break;
                };
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(id, Entry { raster, last_used });
        true
    }
    pub fn invalidate(&mut self, id: LayerID) {
        self.epoch += 1;
        self.entries.remove(&id);
    }
    pub fn clear(&mut self) {
        self.epoch += 1;
        self.entries.clear();
    }
}
