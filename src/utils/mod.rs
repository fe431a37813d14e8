//! # Utilities Module
//!
//! Geometry for the real-time layer and graph search over the room grid.

pub mod math;
pub mod pathfinding;

pub use math::*;
pub use pathfinding::*;
