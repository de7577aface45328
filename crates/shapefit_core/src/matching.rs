//! Maps each stop of a trip to an index within its shape polyline.
//!
//! Two families: a distance-traveled lookup used when the feed supplies
//! distance data on both the shape and the stop times, and a geometric
//! projection used otherwise. The geometric family offers a greedy linear
//! scan and a global divide-and-conquer refinement.

use shapefit_model::LatLng;

use crate::geometry::closest_point;

/// Index into a shape's point array.
pub type ShapeOffset = u32;

/// Strategy for the geometric matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchingStrategy {
    /// Greedy left-to-right scan over a shrinking window. Strictly
    /// increasing offsets by construction, O(shape) per trip, but an early
    /// greedy choice can force a poor fit for a later stop.
    #[default]
    LinearBestFit,
    /// Recursive bisection at the globally best-fitting stop. Better overall
    /// fit at the cost of O(n log n) amortized re-projections.
    MinimalDistanceGlobal,
}

/// Offsets from distance-traveled data: for each stop distance, the index of
/// the first cumulative shape distance that is >= it.
///
/// The cursor only ever advances, so offsets are non-decreasing and the whole
/// trip costs one forward pass over the shape's distance table.
pub fn offsets_by_dist_traveled(stop_dists: &[f64], shape_dists: &[f64]) -> Vec<ShapeOffset> {
    let mut offsets = Vec::with_capacity(stop_dists.len());
    let mut cursor = 0usize;
    for &dist in stop_dists {
        cursor += shape_dists[cursor..].partition_point(|&d| d < dist);
        offsets.push(cursor as ShapeOffset);
    }
    offsets
}

/// Offsets from stop coordinates via nearest-point projection.
///
/// Returns `None` when the shape has fewer points than the trip has stops:
/// every stop needs at least one shape point of its own. Otherwise the
/// result has one offset per stop, first 0, last `shape.len() - 1`, strictly
/// increasing throughout.
pub fn offsets_by_stops(
    shape: &[LatLng],
    stops: &[LatLng],
    strategy: MatchingStrategy,
) -> Option<Vec<ShapeOffset>> {
    if shape.len() < stops.len() || stops.len() < 2 {
        return None;
    }

    let offsets = match strategy {
        MatchingStrategy::LinearBestFit => {
            let mut offsets = vec![0 as ShapeOffset; stops.len()];
            let mut remaining_start = 1usize;
            // Reserve space to map each stop to a different point.
            let mut max_width = shape.len() - stops.len();
            for (i, pos) in stops.iter().enumerate() {
                if i == 0 {
                    offsets[0] = 0;
                } else if i == stops.len() - 1 {
                    offsets[i] = (shape.len() - 1) as ShapeOffset;
                } else {
                    let window = &shape[remaining_start..remaining_start + max_width + 1];
                    let (offset, _) = closest_point(*pos, window);
                    offsets[i] = (remaining_start + offset) as ShapeOffset;
                    remaining_start += offset + 1;
                    max_width -= offset;
                }
            }
            offsets
        }
        MatchingStrategy::MinimalDistanceGlobal => {
            let mut fits = vec![BestFit::default(); stops.len()];
            fits[stops.len() - 1] = BestFit {
                distance: 0.0,
                candidate: (shape.len() - 1) as ShapeOffset,
            };
            match_stops_segment(
                &mut fits,
                shape,
                stops,
                Anchor { stop: 0, offset: 0 },
                Anchor {
                    stop: stops.len() - 1,
                    offset: shape.len() - 1,
                },
            );
            fits.iter().map(|fit| fit.candidate).collect()
        }
    };
    Some(offsets)
}

/// Current best projection for one stop; `candidate` is only trusted while it
/// lies inside the stop's bracketing window.
#[derive(Debug, Clone, Copy, Default)]
struct BestFit {
    distance: f64,
    candidate: ShapeOffset,
}

/// A resolved (stop index, shape offset) pair bracketing a recursion range.
#[derive(Debug, Clone, Copy)]
struct Anchor {
    stop: usize,
    offset: usize,
}

/// Resolves all stops on the exclusive interval `]from.stop, to.stop[` by
/// splitting at the stop with the globally minimal projection distance, then
/// recursing independently on both halves. Offsets fixed by outer calls are
/// never revisited; a stop is re-projected only when a new split has
/// tightened its window.
fn match_stops_segment(
    fits: &mut [BestFit],
    shape: &[LatLng],
    stops: &[LatLng],
    from: Anchor,
    to: Anchor,
) {
    if to.stop - from.stop < 2 {
        return;
    }
    let shape_width = (to.offset - from.offset) - (to.stop - from.stop) + 1;
    let offset_adjustment = from.offset - from.stop;
    let mut min_dist = 0.0;
    let mut min_pos = 0usize;
    for stop_idx in from.stop + 1..to.stop {
        let window_start = stop_idx + offset_adjustment;
        let candidate = fits[stop_idx].candidate as usize;
        if candidate < window_start || candidate >= window_start + shape_width {
            let window = &shape[window_start..window_start + shape_width];
            let (offset, distance) = closest_point(stops[stop_idx], window);
            fits[stop_idx] = BestFit {
                distance,
                candidate: (window_start + offset) as ShapeOffset,
            };
        }
        // min_pos == 0 marks "unset": interior stops start at index 1.
        if min_pos == 0 || fits[stop_idx].distance < min_dist {
            min_dist = fits[stop_idx].distance;
            min_pos = stop_idx;
        }
    }
    let split = Anchor {
        stop: min_pos,
        offset: fits[min_pos].candidate as usize,
    };
    match_stops_segment(fits, shape, stops, from, split);
    match_stops_segment(fits, shape, stops, split, to);
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRATEGIES: [MatchingStrategy; 2] = [
        MatchingStrategy::LinearBestFit,
        MatchingStrategy::MinimalDistanceGlobal,
    ];

    fn line(points: usize) -> Vec<LatLng> {
        (0..points)
            .map(|i| LatLng::new(0.0, i as f64 * 0.01))
            .collect()
    }

    fn assert_valid_offsets(offsets: &[ShapeOffset], stops: usize, shape_len: usize) {
        assert_eq!(offsets.len(), stops);
        assert_eq!(offsets[0], 0);
        assert_eq!(*offsets.last().unwrap() as usize, shape_len - 1);
        for pair in offsets.windows(2) {
            assert!(pair[0] < pair[1], "offsets not strictly increasing: {offsets:?}");
        }
    }

    #[test]
    fn dist_traveled_picks_smallest_greater_or_equal() {
        let shape_dists = [0.0, 100.0, 250.0, 400.0];
        let offsets = offsets_by_dist_traveled(&[0.0, 90.0, 250.0, 500.0], &shape_dists);
        assert_eq!(offsets, vec![0, 1, 2, 4]);
    }

    #[test]
    fn dist_traveled_offsets_are_non_decreasing() {
        let shape_dists = [0.0, 100.0, 100.0, 400.0];
        let offsets = offsets_by_dist_traveled(&[50.0, 50.0, 100.0, 100.0], &shape_dists);
        assert_eq!(offsets, vec![1, 1, 1, 1]);
        for pair in offsets.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn dist_traveled_cursor_never_rewinds() {
        // The second stop asks for a smaller distance than the first; the
        // cursor stays put instead of moving backwards.
        let shape_dists = [0.0, 100.0, 200.0, 300.0];
        let offsets = offsets_by_dist_traveled(&[250.0, 100.0], &shape_dists);
        assert_eq!(offsets, vec![3, 3]);
    }

    #[test]
    fn rejects_shape_shorter_than_stop_count() {
        let shape = line(3);
        let stops = line(4);
        for strategy in STRATEGIES {
            assert_eq!(offsets_by_stops(&shape, &stops, strategy), None);
        }
    }

    #[test]
    fn identity_when_point_count_equals_stop_count() {
        for count in [2usize, 3, 5, 8] {
            let shape = line(count);
            for strategy in STRATEGIES {
                let offsets = offsets_by_stops(&shape, &shape, strategy).unwrap();
                let expected: Vec<ShapeOffset> = (0..count as ShapeOffset).collect();
                assert_eq!(offsets, expected, "{strategy:?} with {count} points");
            }
        }
    }

    #[test]
    fn two_stop_trip_pins_endpoints() {
        let shape = line(10);
        let stops = [shape[0], shape[9]];
        for strategy in STRATEGIES {
            let offsets = offsets_by_stops(&shape, &stops, strategy).unwrap();
            assert_eq!(offsets, vec![0, 9]);
        }
    }

    #[test]
    fn interior_stops_snap_to_nearest_points() {
        let shape = line(10);
        // Stops sitting exactly on points 0, 4, 7, 9.
        let stops = [shape[0], shape[4], shape[7], shape[9]];
        for strategy in STRATEGIES {
            let offsets = offsets_by_stops(&shape, &stops, strategy).unwrap();
            assert_eq!(offsets, vec![0, 4, 7, 9], "{strategy:?}");
        }
    }

    #[test]
    fn offsets_are_strictly_increasing_on_zigzag() {
        let shape: Vec<LatLng> = (0..50)
            .map(|i| {
                let lat = if i % 2 == 0 { 0.0 } else { 0.001 };
                LatLng::new(lat, i as f64 * 0.002)
            })
            .collect();
        let stops: Vec<LatLng> = (0..8)
            .map(|i| LatLng::new(0.0005, i as f64 * 0.014))
            .collect();
        for strategy in STRATEGIES {
            let offsets = offsets_by_stops(&shape, &stops, strategy).unwrap();
            assert_valid_offsets(&offsets, stops.len(), shape.len());
        }
    }

    #[test]
    fn global_strategy_recovers_from_greedy_trap() {
        // Two stops share the same position near the start of the shape. The
        // greedy scan gives both a cheap early point, while the global split
        // still yields a valid strictly increasing assignment; both must
        // satisfy the ordering contract.
        let shape = line(12);
        let stops = [shape[0], shape[2], shape[2], shape[11]];
        for strategy in STRATEGIES {
            let offsets = offsets_by_stops(&shape, &stops, strategy).unwrap();
            assert_valid_offsets(&offsets, stops.len(), shape.len());
        }
    }

    #[test]
    fn tie_break_prefers_lowest_shape_index() {
        // Duplicate points in the shape: the stop projects at zero distance
        // onto both copies; the earlier index must win.
        let shape = [
            LatLng::new(0.0, 0.0),
            LatLng::new(0.0, 0.01),
            LatLng::new(0.0, 0.01),
            LatLng::new(0.0, 0.02),
            LatLng::new(0.0, 0.03),
        ];
        let stops = [shape[0], LatLng::new(0.0, 0.01), shape[4]];
        for strategy in STRATEGIES {
            let offsets = offsets_by_stops(&shape, &stops, strategy).unwrap();
            assert_eq!(offsets[1], 1, "{strategy:?}");
        }
    }
}
