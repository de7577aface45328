//! Splits a shape polyline into one sub-polyline per stop-to-stop leg.
//!
//! Interior stops are projected onto the shape and become shared segment
//! boundaries; the outermost segments are clamped to the actual first and
//! last stop coordinates rather than the shape's endpoints.

use shapefit_model::LatLng;

use crate::geometry::split_polyline;

/// Cuts `shape` into `stops.len() - 1` segments, one per consecutive stop
/// pair.
///
/// Segment `i` starts at the boundary of segment `i - 1` (for `i == 0`, at
/// `stops[0]` itself), carries all shape points strictly between the two
/// boundaries, and ends at the projection of stop `i + 1` (for the final
/// segment, at the last stop itself). Fewer than two stops or fewer than two
/// shape points yield no segments.
pub fn split_shape(shape: &[LatLng], stops: &[LatLng]) -> Vec<Vec<LatLng>> {
    if stops.len() < 2 || shape.len() < 2 {
        return Vec::new();
    }

    let waypoints = &stops[1..stops.len() - 1];
    let splits = split_polyline(shape, waypoints);

    let mut segments = Vec::with_capacity(stops.len() - 1);
    let mut last = stops[0];
    let mut last_offset = 0usize;
    for (boundary, offset) in splits {
        let mut segment = Vec::with_capacity(offset - last_offset + 2);
        segment.push(last);
        segment.extend_from_slice(&shape[last_offset + 1..offset + 1]);
        segment.push(boundary);
        segments.push(segment);
        last = boundary;
        last_offset = offset;
    }

    // The last shape point is dropped in favor of the last stop coordinate.
    let mut segment = Vec::with_capacity(shape.len() - last_offset + 1);
    segment.push(last);
    segment.extend_from_slice(&shape[last_offset + 1..shape.len() - 1]);
    segment.push(stops[stops.len() - 1]);
    segments.push(segment);

    segments
}
