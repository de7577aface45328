//! Spherical geometry over unit vectors.
//!
//! All distances are great-circle meters. Segment projection works on unit
//! sphere vectors rather than planar approximations so it stays correct near
//! the poles and across the antimeridian.

use shapefit_model::LatLng;

const EARTH_RADIUS_METERS: f64 = 6_371_010.0;

#[derive(Debug, Clone, Copy)]
struct Vec3 {
    x: f64,
    y: f64,
    z: f64,
}

impl Vec3 {
    fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    fn cross(self, other: Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }

    fn normalize(self) -> Self {
        let norm = self.norm();
        if norm == 0.0 {
            return self;
        }
        Self {
            x: self.x / norm,
            y: self.y / norm,
            z: self.z / norm,
        }
    }

    fn scale(self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            z: self.z * factor,
        }
    }

    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

fn lat_lng_to_vec(point: LatLng) -> Vec3 {
    let lat = point.lat.to_radians();
    let lon = point.lon.to_radians();
    let cos_lat = lat.cos();
    Vec3 {
        x: cos_lat * lon.cos(),
        y: cos_lat * lon.sin(),
        z: lat.sin(),
    }
}

fn vec_to_lat_lng(point: Vec3) -> LatLng {
    let normalized = point.normalize();
    let lat = normalized.z.asin();
    let lon = normalized.y.atan2(normalized.x);
    LatLng {
        lat: lat.to_degrees(),
        lon: lon.to_degrees(),
    }
}

fn angular_distance(a: Vec3, b: Vec3) -> f64 {
    let cross = a.cross(b);
    let sin = cross.norm();
    let cos = a.dot(b);
    sin.atan2(cos)
}

fn distance_meters_vec(a: Vec3, b: Vec3) -> f64 {
    angular_distance(a, b) * EARTH_RADIUS_METERS
}

/// Great-circle distance between two coordinates in meters.
pub fn haversine_meters(a: LatLng, b: LatLng) -> f64 {
    distance_meters_vec(lat_lng_to_vec(a), lat_lng_to_vec(b))
}

/// Nearest point on the great-circle segment `left`..`right`, together with
/// the distance from `point` to it in meters.
pub fn closest_point_on_segment(point: LatLng, left: LatLng, right: LatLng) -> (LatLng, f64) {
    let p = lat_lng_to_vec(point);
    let a = lat_lng_to_vec(left);
    let b = lat_lng_to_vec(right);
    let n = a.cross(b);
    let n_norm = n.norm();
    if n_norm == 0.0 {
        // Degenerate segment: both endpoints coincide (or are antipodal).
        let distance = distance_meters_vec(p, a);
        return (left, distance);
    }
    let n_unit = n.scale(1.0 / n_norm);
    let m = n_unit.cross(p);
    let m_norm = m.norm();
    if m_norm == 0.0 {
        // Query point lies on the great-circle normal; either endpoint works.
        let dist_a = distance_meters_vec(p, a);
        let dist_b = distance_meters_vec(p, b);
        return if dist_a <= dist_b {
            (left, dist_a)
        } else {
            (right, dist_b)
        };
    }
    let mut q = m.cross(n_unit).normalize();
    if q.dot(p) < 0.0 {
        q = q.neg();
    }

    let angle_ab = angular_distance(a, b);
    let angle_aq = angular_distance(a, q);
    let angle_qb = angular_distance(q, b);
    let on_segment = angle_aq + angle_qb <= angle_ab + 1e-12;
    let closest = if on_segment {
        q
    } else if angular_distance(a, p) <= angular_distance(b, p) {
        a
    } else {
        b
    };

    let matched = vec_to_lat_lng(closest);
    let distance = distance_meters_vec(p, closest);
    (matched, distance)
}

/// Index of the shape point closest to `pos` within `shape`, plus the
/// perpendicular distance from `pos` to the polyline in meters.
///
/// The winning segment is resolved to whichever of its two endpoints lies
/// nearer to `pos`. Slices with fewer than two points degenerate to
/// `(0, 0.0)`. Ties prefer the lowest index, keeping results deterministic.
pub fn closest_point(pos: LatLng, shape: &[LatLng]) -> (usize, f64) {
    if shape.len() < 2 {
        return (0, 0.0);
    }
    let mut best_segment = 0usize;
    let mut best_distance = f64::INFINITY;
    for index in 0..shape.len() - 1 {
        let (_, distance) = closest_point_on_segment(pos, shape[index], shape[index + 1]);
        if distance < best_distance {
            best_distance = distance;
            best_segment = index;
        }
    }
    let from = shape[best_segment];
    let to = shape[best_segment + 1];
    if haversine_meters(pos, from) <= haversine_meters(pos, to) {
        (best_segment, best_distance)
    } else {
        (best_segment + 1, best_distance)
    }
}

/// Projects each waypoint, in order, onto the polyline and returns the
/// projected boundary point together with the index of the segment it falls
/// on. The search never moves backwards: each waypoint is matched against the
/// polyline from the previous match onwards, so returned indices are
/// non-decreasing.
pub fn split_polyline(shape: &[LatLng], waypoints: &[LatLng]) -> Vec<(LatLng, usize)> {
    let mut splits = Vec::with_capacity(waypoints.len());
    if shape.len() < 2 {
        return splits;
    }
    let mut cursor = 0usize;
    for waypoint in waypoints {
        let tail = &shape[cursor..];
        let mut best_segment = 0usize;
        let mut best_point = tail[0];
        let mut best_distance = f64::INFINITY;
        for index in 0..tail.len().saturating_sub(1) {
            let (point, distance) =
                closest_point_on_segment(*waypoint, tail[index], tail[index + 1]);
            if distance < best_distance {
                best_distance = distance;
                best_segment = index;
                best_point = point;
            }
        }
        cursor += best_segment;
        splits.push((best_point, cursor));
    }
    splits
}
