use std::borrow::Borrow;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lon: f64,
}

impl LatLng {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lat, self.lon)
    }
}

/// A shape identifier from `shapes.txt`.
///
/// GTFS makes no promises about identifier content, so this is an opaque byte
/// string: it may be empty, contain embedded NUL bytes, or not be valid UTF-8.
/// It is only ever compared and hashed, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ShapeId(Vec<u8>);

impl ShapeId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for ShapeId {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<&[u8]> for ShapeId {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl From<Vec<u8>> for ShapeId {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

// Lets hash maps keyed by ShapeId be queried with a plain byte slice.
impl Borrow<[u8]> for ShapeId {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl<'de> Deserialize<'de> for ShapeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ShapeIdVisitor;

        impl<'de> Visitor<'de> for ShapeIdVisitor {
            type Value = ShapeId;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a shape identifier (arbitrary bytes)")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<ShapeId, E> {
                Ok(ShapeId::from(value))
            }

            fn visit_string<E: de::Error>(self, value: String) -> Result<ShapeId, E> {
                Ok(ShapeId::new(value.into_bytes()))
            }

            fn visit_bytes<E: de::Error>(self, value: &[u8]) -> Result<ShapeId, E> {
                Ok(ShapeId::from(value))
            }

            fn visit_byte_buf<E: de::Error>(self, value: Vec<u8>) -> Result<ShapeId, E> {
                Ok(ShapeId::new(value))
            }
        }

        deserializer.deserialize_byte_buf(ShapeIdVisitor)
    }
}

/// One row of `shapes.txt`. Fields are matched to CSV columns by name, so the
/// column order in the input file is irrelevant.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShapeRecord {
    pub shape_id: ShapeId,
    pub shape_pt_lat: f64,
    pub shape_pt_lon: f64,
    pub shape_pt_sequence: u32,
    /// Cumulative distance traveled up to this point. `None` (or 0) means the
    /// feed did not supply distance data for this row.
    #[serde(default)]
    pub shape_dist_traveled: Option<f64>,
}

impl ShapeRecord {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.shape_pt_lat, self.shape_pt_lon)
    }
}
