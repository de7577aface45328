//! Per-trip offset resolution with deduplication.
//!
//! Many trips reuse the same shape with the same stop pattern; their offset
//! lists are identical. Computed lists live once in an append-only
//! [`OffsetTable`] and trips carry only the index, deduplicated through a
//! cache keyed by shape index plus stop-sequence content.

use rustc_hash::FxHashMap;
use tracing::warn;

use shapefit_model::LatLng;

use crate::matching::{
    offsets_by_dist_traveled, offsets_by_stops, MatchingStrategy, ShapeOffset,
};
use crate::progress::ProgressHandler;
use crate::store::{ShapeIdx, ShapePointStore};

/// Index of an offset list in the [`OffsetTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OffsetListIdx(u32);

impl OffsetListIdx {
    /// Sentinel meaning "no shape data available for this trip"; consumers
    /// must treat it as "no polyline".
    pub const INVALID: OffsetListIdx = OffsetListIdx(u32::MAX);

    pub fn is_invalid(self) -> bool {
        self == Self::INVALID
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl Default for OffsetListIdx {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Append-only store of resolved offset lists.
#[derive(Debug, Default)]
pub struct OffsetTable {
    lists: Vec<Vec<ShapeOffset>>,
}

impl OffsetTable {
    pub fn push(&mut self, offsets: Vec<ShapeOffset>) -> OffsetListIdx {
        let idx = OffsetListIdx(self.lists.len() as u32);
        self.lists.push(offsets);
        idx
    }

    /// `None` for the invalid sentinel or an out-of-range index.
    pub fn get(&self, idx: OffsetListIdx) -> Option<&[ShapeOffset]> {
        if idx.is_invalid() {
            return None;
        }
        self.lists.get(idx.index()).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

/// One trip as seen by the resolver: which shape it runs on, the stops it
/// visits (as indices into the caller's stop coordinate table) and the
/// optional per-stop distance-traveled values from the stop-times table.
#[derive(Debug, Clone)]
pub struct Trip {
    pub shape_idx: ShapeIdx,
    pub stop_seq: Vec<u32>,
    /// Parallel to `stop_seq`; empty when the feed supplied no data.
    pub dist_traveled: Vec<f64>,
    /// Output slot, filled by [`OffsetResolver::resolve_trips`].
    pub offsets: OffsetListIdx,
}

impl Trip {
    pub fn new(shape_idx: ShapeIdx, stop_seq: Vec<u32>) -> Self {
        Self {
            shape_idx,
            stop_seq,
            dist_traveled: Vec::new(),
            offsets: OffsetListIdx::INVALID,
        }
    }

    pub fn with_dist_traveled(mut self, dist_traveled: Vec<f64>) -> Self {
        self.dist_traveled = dist_traveled;
        self
    }

    pub fn has_offsets(&self) -> bool {
        !self.offsets.is_invalid()
    }
}

/// Configuration for a matching pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchConfig {
    pub strategy: MatchingStrategy,
}

/// Resolves trips to offset lists, deduplicating structurally identical
/// (shape, stop sequence) pairs. Lives for one matching pass over all trips.
pub struct OffsetResolver<'a> {
    store: &'a ShapePointStore,
    stop_coords: &'a [LatLng],
    config: MatchConfig,
    table: OffsetTable,
    cache: FxHashMap<(ShapeIdx, Vec<u32>), OffsetListIdx>,
}

impl<'a> OffsetResolver<'a> {
    pub fn new(store: &'a ShapePointStore, stop_coords: &'a [LatLng], config: MatchConfig) -> Self {
        Self {
            store,
            stop_coords,
            config,
            table: OffsetTable::default(),
            cache: FxHashMap::default(),
        }
    }

    /// Offset list index for one (shape, stop sequence) pair. The matcher
    /// runs once per structurally distinct key; repeated calls, even from
    /// different trips, hit the cache.
    pub fn resolve(
        &mut self,
        shape_idx: ShapeIdx,
        stop_seq: &[u32],
        stop_dists: &[f64],
    ) -> OffsetListIdx {
        let Self {
            store,
            stop_coords,
            config,
            table,
            cache,
        } = self;
        *cache
            .entry((shape_idx, stop_seq.to_vec()))
            .or_insert_with(|| {
                compute_offsets(store, stop_coords, *config, table, shape_idx, stop_seq, stop_dists)
            })
    }

    /// Resolves every trip, assigning its `offsets` slot, with one progress
    /// tick per trip. Returns the number of trips left without usable
    /// offsets, which is also reported once in aggregate.
    pub fn resolve_trips(&mut self, trips: &mut [Trip], progress: &dyn ProgressHandler) -> usize {
        progress.set_total_trips(trips.len());
        let mut unmatched = 0usize;
        for trip in trips.iter_mut() {
            trip.offsets = self.resolve(trip.shape_idx, &trip.stop_seq, &trip.dist_traveled);
            if trip.offsets.is_invalid() {
                unmatched += 1;
            }
            progress.on_trip_resolved();
        }
        if unmatched > 0 {
            warn!("{} trips without usable shape offsets", unmatched);
        }
        unmatched
    }

    pub fn offsets(&self) -> &OffsetTable {
        &self.table
    }

    /// Consumes the resolver, keeping only the offset lists. The cache is
    /// dropped; it has no value past the matching pass.
    pub fn into_table(self) -> OffsetTable {
        self.table
    }
}

fn compute_offsets(
    store: &ShapePointStore,
    stop_coords: &[LatLng],
    config: MatchConfig,
    table: &mut OffsetTable,
    shape_idx: ShapeIdx,
    stop_seq: &[u32],
    stop_dists: &[f64],
) -> OffsetListIdx {
    if shape_idx.is_invalid() || stop_seq.len() < 2 {
        return OffsetListIdx::INVALID;
    }

    let shape_dists = store.distances(shape_idx);
    if !shape_dists.is_empty() && !stop_dists.is_empty() {
        return table.push(offsets_by_dist_traveled(stop_dists, shape_dists));
    }

    let shape = store.get(shape_idx);
    let mut positions = Vec::with_capacity(stop_seq.len());
    for &stop in stop_seq {
        match stop_coords.get(stop as usize) {
            Some(&pos) => positions.push(pos),
            None => return OffsetListIdx::INVALID,
        }
    }
    match offsets_by_stops(shape, &positions, config.strategy) {
        Some(offsets) => table.push(offsets),
        None => OffsetListIdx::INVALID,
    }
}
