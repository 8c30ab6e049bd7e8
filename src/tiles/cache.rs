use super::address::TileAddress;
use super::loader::TileHandle;
use lru::LruCache;
use std::collections::BTreeSet;
use std::num::NonZeroUsize;

/// One cache record. `resource == None` is a negative entry: the tile was
/// looked up and confirmed absent.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub address: TileAddress,
    pub resource: Option<TileHandle>,
}

impl CacheEntry {
    pub fn is_loaded(&self) -> bool {
        self.resource.is_some()
    }
}

/// Counters kept by [`TileCache`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Loader invocations
    pub loads: u64,
    pub evictions: u64,
    pub size: usize,
}

/// Bounded LRU store of tile lookups.
///
/// The cache is owned by the worker thread, so no locking happens here.
/// Entries are never modified after insertion; only eviction or
/// [`TileCache::clear`] removes them.
#[derive(Debug)]
pub struct TileCache {
    entries: LruCache<TileAddress, CacheEntry>,
    hits: u64,
    misses: u64,
    loads: u64,
    evictions: u64,
}

impl TileCache {
    /// Create a new tile cache with the given capacity (at least one entry)
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: LruCache::new(Self::non_zero(capacity)),
            hits: 0,
            misses: 0,
            loads: 0,
            evictions: 0,
        }
    }

    /// Create a new tile cache with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(crate::core::constants::DEFAULT_CACHE_CAPACITY)
    }

    fn non_zero(capacity: usize) -> NonZeroUsize {
        NonZeroUsize::new(capacity).unwrap_or_else(|| {
            log::warn!("tile cache capacity 0 requested, using 1");
            NonZeroUsize::MIN
        })
    }

    /// Looks up an entry and marks it recently used. Never loads.
    pub fn get(&mut self, address: &TileAddress) -> Option<CacheEntry> {
        let entry = self.entries.get(address).cloned();
        if entry.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        entry
    }

    /// Returns the entry for `address`, running `loader` on a miss.
    ///
    /// The loader result, present or absent, is inserted and the least
    /// recently used entries are evicted down to capacity.
    pub fn ensure<F>(&mut self, address: &TileAddress, loader: F) -> CacheEntry
    where
        F: FnOnce(&TileAddress) -> Option<TileHandle>,
    {
        if let Some(entry) = self.get(address) {
            return entry;
        }

        self.loads += 1;
        let entry = CacheEntry {
            address: *address,
            resource: loader(address),
        };
        if self.entries.push(*address, entry.clone()).is_some() {
            self.evictions += 1;
        }
        entry
    }

    /// Ascending fallback: ensures `address` and, while nothing is loaded,
    /// each ancestor up to zoom 0. Every visited address goes into
    /// `attempted`. Returns the first entry that holds a tile.
    ///
    /// Performs at most `zoom + 1` lookups.
    pub fn ensure_ascending<F>(
        &mut self,
        address: &TileAddress,
        loader: &mut F,
        attempted: &mut BTreeSet<TileAddress>,
    ) -> Option<CacheEntry>
    where
        F: FnMut(&TileAddress) -> Option<TileHandle>,
    {
        let mut current = *address;
        loop {
            let entry = self.ensure(&current, |a| loader(a));
            attempted.insert(current);
            if entry.is_loaded() {
                return Some(entry);
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    /// Checks if an address is cached without touching its recency
    pub fn contains(&self, address: &TileAddress) -> bool {
        self.entries.contains(address)
    }

    /// Addresses currently cached, most recently used first
    pub fn addresses(&self) -> Vec<TileAddress> {
        self.entries.iter().map(|(address, _)| *address).collect()
    }

    /// Drops every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Changes the bound; shrinking evicts least recently used entries at once.
    pub fn set_capacity(&mut self, capacity: usize) {
        let before = self.entries.len();
        self.entries.resize(Self::non_zero(capacity));
        self.evictions += before.saturating_sub(self.entries.len()) as u64;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            loads: self.loads,
            evictions: self.evictions,
            size: self.entries.len(),
        }
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
