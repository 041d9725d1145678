//! Spatial indexing utilities.
//!
//! Uniform grid used for sprite, orb and collider proximity queries.

mod grid;

pub use grid::{CellKey, GridIndex, GridItem, NearbyCache, Shape};
