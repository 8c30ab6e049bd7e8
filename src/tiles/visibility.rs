//! Diffing of requested regions into show/hide decisions

use super::address::{TileAddress, TileRegion};
use super::cache::TileCache;
use super::loader::TileHandle;
use super::source::TileSource;
use fxhash::FxHashMap;
use std::collections::BTreeSet;
use std::sync::Arc;

/// What one region update changed on screen
#[derive(Debug, Default)]
pub struct VisibilityChange {
    /// Tiles to add, ordered by address
    pub shown: Vec<(TileAddress, TileHandle)>,
    /// Tiles to remove, ordered by address
    pub hidden: Vec<(TileAddress, TileHandle)>,
    /// The region matched the previous one and nothing was evaluated
    pub unchanged: bool,
}

impl VisibilityChange {
    pub fn is_empty(&self) -> bool {
        self.shown.is_empty() && self.hidden.is_empty()
    }
}

/// Tracks which addresses were attempted and which are on screen across
/// region requests.
///
/// Every address visited by the ascending fallback is remembered, not just
/// the shown ones, so that a substituted ancestor is hidden again once the
/// cells it stood in for are no longer requested. Only addresses that hold a
/// tile ever become visible.
#[derive(Debug, Default)]
pub struct VisibilityTracker {
    previous_region: Option<TileRegion>,
    attempted: BTreeSet<TileAddress>,
    visible: FxHashMap<TileAddress, TileHandle>,
}

impl VisibilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates `region` against the previous request.
    pub fn update<S>(
        &mut self,
        region: &TileRegion,
        cache: &mut TileCache,
        source: &S,
    ) -> VisibilityChange
    where
        S: TileSource + ?Sized,
    {
        if self.previous_region.as_ref() == Some(region) {
            log::debug!("region unchanged, skipping: {:?}", region);
            return VisibilityChange {
                unchanged: true,
                ..Default::default()
            };
        }

        let mut loader = |address: &TileAddress| source.load(address).map(Arc::new);
        let mut attempted = BTreeSet::new();
        let mut loaded: FxHashMap<TileAddress, TileHandle> = FxHashMap::default();
        for leaf in region.leaves() {
            if let Some(entry) = cache.ensure_ascending(&leaf, &mut loader, &mut attempted) {
                if let Some(resource) = entry.resource {
                    loaded.insert(entry.address, resource);
                }
            }
        }

        let mut change = VisibilityChange::default();
        for address in &attempted {
            if self.visible.contains_key(address) {
                continue;
            }
            if let Some(tile) = loaded.get(address) {
                self.visible.insert(*address, Arc::clone(tile));
                change.shown.push((*address, Arc::clone(tile)));
            }
        }
        for address in self.attempted.difference(&attempted) {
            if let Some(tile) = self.visible.remove(address) {
                change.hidden.push((*address, tile));
            }
        }

        log::debug!(
            "region {:?}: {} attempted, {} shown, {} hidden, {} visible",
            region,
            attempted.len(),
            change.shown.len(),
            change.hidden.len(),
            self.visible.len()
        );
        self.attempted = attempted;
        self.previous_region = Some(*region);
        change
    }

    /// Forgets the previous region so the next request is evaluated in
    /// full. Attempted and visible sets are kept, so that request's diff
    /// hides whatever no longer applies.
    pub fn invalidate(&mut self) {
        self.previous_region = None;
    }

    /// Hides everything and resets all state.
    pub fn hide_all(&mut self) -> Vec<(TileAddress, TileHandle)> {
        self.previous_region = None;
        self.attempted.clear();
        let mut hidden: Vec<_> = self.visible.drain().collect();
        hidden.sort_by_key(|(address, _)| *address);
        hidden
    }

    pub fn previous_region(&self) -> Option<&TileRegion> {
        self.previous_region.as_ref()
    }

    pub fn attempted(&self) -> &BTreeSet<TileAddress> {
        &self.attempted
    }

    pub fn is_visible(&self, address: &TileAddress) -> bool {
        self.visible.contains_key(address)
    }

    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    pub fn visible_addresses(&self) -> BTreeSet<TileAddress> {
        self.visible.keys().copied().collect()
    }
}
