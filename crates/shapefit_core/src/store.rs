//! Indexed storage for shape polylines.
//!
//! Shape rows stream in grouped-by-nothing: rows for different shapes may
//! interleave and sequence numbers may arrive out of order. The
//! [`ShapeLoader`] buffers rows per shape, flags shapes whose sequence
//! numbers are observed non-increasing, and commits everything into a compact
//! [`ShapePointStore`] at the end of the stream. Only flagged shapes pay for
//! a corrective sort.

use csv::ReaderBuilder;
use rustc_hash::FxHashMap;
use tracing::warn;

use shapefit_model::{LatLng, ShapeId, ShapeRecord};

use crate::error::ShapeLoadError;
use crate::progress::ProgressHandler;

pub const SHAPES_FILE: &str = "shapes.txt";

const REQUIRED_COLUMNS: &[&str] = &[
    "shape_id",
    "shape_pt_lat",
    "shape_pt_lon",
    "shape_pt_sequence",
];

/// Dense index of a shape, assigned in first-seen order during a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeIdx(u32);

impl ShapeIdx {
    /// Sentinel for "this trip has no shape".
    pub const INVALID: ShapeIdx = ShapeIdx(u32::MAX);

    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn is_invalid(self) -> bool {
        self == Self::INVALID
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A non-monotonic sequence number observed within one shape. The offending
/// row is kept and the shape is sorted before commit; this is a warning, not
/// an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceWarning {
    pub shape_id: ShapeId,
    pub prev_seq: u32,
    pub seq: u32,
}

#[derive(Debug, Clone, Copy)]
struct BufferedPoint {
    seq: u32,
    dist_traveled: f64,
    pos: LatLng,
}

#[derive(Debug, Default)]
struct ShapeBuffer {
    points: Vec<BufferedPoint>,
    last_seq: u32,
    needs_sort: bool,
    has_dist: bool,
}

/// Accumulates shape rows during one loading pass. Append-only; call
/// [`ShapeLoader::finish`] to obtain the immutable store.
#[derive(Debug, Default)]
pub struct ShapeLoader {
    buffers: Vec<ShapeBuffer>,
    ids: Vec<ShapeId>,
    by_id: FxHashMap<ShapeId, ShapeIdx>,
    warnings: Vec<SequenceWarning>,
}

impl ShapeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one shape row. First sight of a shape id assigns the next
    /// dense [`ShapeIdx`].
    pub fn push(&mut self, record: &ShapeRecord) {
        let idx = match self.by_id.get(record.shape_id.as_bytes()) {
            Some(&idx) => idx,
            None => {
                let idx = ShapeIdx::new(self.buffers.len() as u32);
                self.buffers.push(ShapeBuffer::default());
                self.ids.push(record.shape_id.clone());
                self.by_id.insert(record.shape_id.clone(), idx);
                idx
            }
        };

        let seq = record.shape_pt_sequence;
        let buffer = &mut self.buffers[idx.index()];
        if !buffer.points.is_empty() && buffer.last_seq >= seq {
            warn!(
                "Non monotonic sequence for shape_id '{}': Sequence number {} followed by {}",
                record.shape_id, buffer.last_seq, seq
            );
            self.warnings.push(SequenceWarning {
                shape_id: record.shape_id.clone(),
                prev_seq: buffer.last_seq,
                seq,
            });
            buffer.needs_sort = true;
        }

        let dist_traveled = record.shape_dist_traveled.unwrap_or(0.0);
        if dist_traveled > 0.0 {
            buffer.has_dist = true;
        }
        buffer.points.push(BufferedPoint {
            seq,
            dist_traveled,
            pos: record.position(),
        });
        buffer.last_seq = seq;
    }

    /// Sorts flagged shapes, derives per-shape distance tables and commits
    /// everything into the compact store.
    pub fn finish(mut self) -> (ShapePointStore, Vec<SequenceWarning>) {
        sort_flagged(&mut self.buffers);

        let total: usize = self.buffers.iter().map(|b| b.points.len()).sum();
        let mut points = Vec::with_capacity(total);
        let mut buckets = Vec::with_capacity(self.buffers.len() + 1);
        let mut distances = Vec::with_capacity(self.buffers.len());
        buckets.push(0u32);
        for buffer in &self.buffers {
            // Distance values are attached to the gaps between consecutive
            // points, stored as the midpoint average of the two bounding
            // rows to absorb feed rounding error.
            let table = if buffer.has_dist {
                buffer
                    .points
                    .windows(2)
                    .map(|pair| (pair[0].dist_traveled + pair[1].dist_traveled) / 2.0)
                    .collect()
            } else {
                Vec::new()
            };
            distances.push(table);
            points.extend(buffer.points.iter().map(|p| p.pos));
            buckets.push(points.len() as u32);
        }

        let store = ShapePointStore {
            points,
            buckets,
            ids: self.ids,
            by_id: self.by_id,
            distances,
        };
        (store, self.warnings)
    }
}

#[cfg(feature = "parallel")]
fn sort_flagged(buffers: &mut [ShapeBuffer]) {
    use rayon::prelude::*;
    buffers
        .par_iter_mut()
        .filter(|buffer| buffer.needs_sort)
        .for_each(|buffer| buffer.points.sort_by_key(|point| point.seq));
}

#[cfg(not(feature = "parallel"))]
fn sort_flagged(buffers: &mut [ShapeBuffer]) {
    for buffer in buffers.iter_mut().filter(|buffer| buffer.needs_sort) {
        buffer.points.sort_by_key(|point| point.seq);
    }
}

/// Immutable two-level indexed store of all shape polylines from one feed.
///
/// All points live in a single contiguous array; a bucket-boundary array maps
/// a [`ShapeIdx`] to its point range in O(1). The layout is flat and
/// offset-based so it can be backed by memory-mapped files for feeds too
/// large to hold in memory; the id map is kept separately for the same
/// reason.
#[derive(Debug, Default)]
pub struct ShapePointStore {
    points: Vec<LatLng>,
    buckets: Vec<u32>,
    ids: Vec<ShapeId>,
    by_id: FxHashMap<ShapeId, ShapeIdx>,
    distances: Vec<Vec<f64>>,
}

impl ShapePointStore {
    /// Number of distinct shapes.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The polyline for a shape. Empty for [`ShapeIdx::INVALID`] or an
    /// out-of-range index, mirroring "no shape means no polyline".
    pub fn get(&self, idx: ShapeIdx) -> &[LatLng] {
        if idx.is_invalid() || idx.index() + 1 >= self.buckets.len() {
            return &[];
        }
        let start = self.buckets[idx.index()] as usize;
        let end = self.buckets[idx.index() + 1] as usize;
        &self.points[start..end]
    }

    /// Per-gap cumulative distance table for a shape; empty when the feed
    /// supplied no usable distance-traveled data for it.
    pub fn distances(&self, idx: ShapeIdx) -> &[f64] {
        if idx.is_invalid() || idx.index() >= self.distances.len() {
            return &[];
        }
        &self.distances[idx.index()]
    }

    /// Looks up a shape by the exact bytes of its identifier.
    pub fn resolve_id(&self, id: &[u8]) -> Option<ShapeIdx> {
        self.by_id.get(id).copied()
    }

    pub fn id(&self, idx: ShapeIdx) -> Option<&ShapeId> {
        self.ids.get(idx.index())
    }

    /// Iterates `(idx, id, polyline)` in index order.
    pub fn iter(&self) -> impl Iterator<Item = (ShapeIdx, &ShapeId, &[LatLng])> {
        self.ids.iter().enumerate().map(|(index, id)| {
            let idx = ShapeIdx::new(index as u32);
            (idx, id, self.get(idx))
        })
    }
}

/// Streams a whole `shapes.txt` table into a [`ShapePointStore`].
///
/// Columns are matched by name; `shape_dist_traveled` is optional. A missing
/// required column or an unparsable numeric field fails the load. Rows with
/// non-monotonic sequence numbers are kept, reported as warnings and
/// corrected by a final stable sort.
pub fn read_shapes(
    data: &[u8],
    progress: &dyn ProgressHandler,
) -> Result<(ShapePointStore, Vec<SequenceWarning>), ShapeLoadError> {
    let data = strip_utf8_bom(data);
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers = reader
        .byte_headers()
        .map_err(|source| ShapeLoadError::Parse {
            file: SHAPES_FILE.to_string(),
            source,
        })?
        .clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|header| header == column.as_bytes()) {
            return Err(ShapeLoadError::MissingColumn {
                file: SHAPES_FILE.to_string(),
                column,
            });
        }
    }

    // Rows are deserialized from byte records: shape ids are arbitrary bytes
    // and must never pass through a UTF-8 check.
    let mut loader = ShapeLoader::new();
    for result in reader.byte_records() {
        let row = result.map_err(|source| ShapeLoadError::Parse {
            file: SHAPES_FILE.to_string(),
            source,
        })?;
        let record: ShapeRecord =
            row.deserialize(Some(&headers))
                .map_err(|source| ShapeLoadError::Parse {
                    file: SHAPES_FILE.to_string(),
                    source,
                })?;
        loader.push(&record);
        progress.on_shape_row();
    }
    Ok(loader.finish())
}

fn strip_utf8_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data)
}
