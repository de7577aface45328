//! Matching of GTFS shape polylines to the stops of the trips that use them.
//!
//! The pipeline: [`read_shapes`] streams `shapes.txt` into an indexed
//! [`ShapePointStore`], an [`OffsetResolver`] assigns every trip an offset
//! list mapping each stop to a shape point (deduplicated across trips with
//! identical stop patterns), and [`split_shape`] cuts a polyline into
//! per-leg segments along those stops.

pub use shapefit_model::{LatLng, ShapeId, ShapeRecord};

pub mod error;
pub mod geometry;
pub mod matching;
pub mod progress;
pub mod resolve;
pub mod segments;
pub mod store;

pub use error::ShapeLoadError;
pub use matching::{offsets_by_dist_traveled, offsets_by_stops, MatchingStrategy, ShapeOffset};
pub use progress::{NoOpProgressHandler, ProgressHandler};
pub use resolve::{MatchConfig, OffsetListIdx, OffsetResolver, OffsetTable, Trip};
pub use segments::split_shape;
pub use store::{
    read_shapes, SequenceWarning, ShapeIdx, ShapeLoader, ShapePointStore, SHAPES_FILE,
};
