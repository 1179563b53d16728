//! Frame access helpers and checked numeric conversions.

pub mod pixel_source;
pub mod safe_cast;

pub use pixel_source::{PixelSource, SolidFrame};
