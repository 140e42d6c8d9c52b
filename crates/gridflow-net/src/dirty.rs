use std::collections::BTreeSet;

use gridflow_core::id::NetworkId;
use gridflow_spatial::TileRect;

/// Accumulates regions invalidated by topology changes during a tick.
///
/// Change notifications only append here; the module drains the tracker
/// once per tick with [`take`](StaleAreaTracker::take), which merges the
/// rectangles before the single discovery pass.
#[derive(Debug, Clone, Default)]
pub struct StaleAreaTracker {
    regions: Vec<TileRect>,
    networks: BTreeSet<NetworkId>,
    full: bool,
}

/// Everything a discovery pass must reconsider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaleSet {
    /// Merged regions. Separate entries may still overlap.
    pub regions: Vec<TileRect>,
    /// Networks invalidated directly, e.g. because a member was removed.
    pub networks: BTreeSet<NetworkId>,
    /// Rebuild everything.
    pub full: bool,
}

impl StaleSet {
    pub fn is_empty(&self) -> bool {
        !self.full && self.regions.is_empty() && self.networks.is_empty()
    }
}

impl StaleAreaTracker {
    /// Create a new tracker with nothing stale.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a region stale.
    pub fn mark_region(&mut self, rect: TileRect) {
        self.regions.push(rect);
    }

    /// Mark a network stale regardless of where its members are.
    pub fn mark_network(&mut self, id: NetworkId) {
        self.networks.insert(id);
    }

    /// Request a full rebuild on the next pass.
    pub fn mark_all(&mut self) {
        self.full = true;
    }

    /// Returns `true` if anything has been marked since the last take.
    pub fn is_dirty(&self) -> bool {
        self.full || !self.regions.is_empty() || !self.networks.is_empty()
    }

    /// Number of raw (unmerged) regions pending.
    pub fn pending_regions(&self) -> usize {
        self.regions.len()
    }

    /// Drain everything pending, merging regions that overlap or touch
    /// where that does not grow the scanned area.
    pub fn take(&mut self) -> StaleSet {
        let regions = merge(std::mem::take(&mut self.regions));
        StaleSet {
            regions,
            networks: std::mem::take(&mut self.networks),
            full: std::mem::take(&mut self.full),
        }
    }
}

/// Merge touching rectangles into their bounding box when the box covers no
/// more tiles than the two parts together. Rectangles that would only merge
/// into a mostly empty box (a diagonal staircase) stay separate.
fn merge(mut rects: Vec<TileRect>) -> Vec<TileRect> {
    let mut merged: Vec<TileRect> = Vec::with_capacity(rects.len());

    while let Some(mut current) = rects.pop() {
        let mut grew = true;
        while grew {
            grew = false;
            let mut i = 0;
            while i < merged.len() {
                if compact_union(&current, &merged[i]) {
                    current = current.union(&merged.swap_remove(i));
                    grew = true;
                } else {
                    i += 1;
                }
            }
        }
        merged.push(current);
    }

    merged.sort_by_key(|r| (r.min.y, r.min.x, r.max.y, r.max.x));
    merged
}

fn compact_union(a: &TileRect, b: &TileRect) -> bool {
    a.expand(1).intersects(b) && a.union(b).area() <= a.area().saturating_add(b.area())
}
