//! Geometry assembly: segments, ring construction, and EWKB emission.

pub mod assembler;
pub mod segment;
pub mod wkb;

pub use assembler::{assemble, AssemblyOutcome, AssemblyStats, MultiPolygon, Polygon, Ring, WayInput};
pub use segment::{Role, Segment};
pub use wkb::{GeometryFactory, OutputEncoding};
