//! # Game Module
//!
//! The dungeon itself and everything that outlives a single battle.
//!
//! - Grid primitives shared by the room graph and the spatial layer
//! - Rooms, their payloads and the navigable [`DungeonMap`]
//! - The active [`DungeonRun`] with its temporary reward accumulators
//! - The account-level [`DungeonProgression`] ledger
//! - An [`Autopilot`] that plays runs headlessly

pub mod autopilot;
pub mod map;
pub mod progression;
pub mod room;
pub mod run;

pub use autopilot::*;
pub use map::*;
pub use progression::*;
pub use room::*;
pub use run::*;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A cell in the room grid.
///
/// # Examples
///
/// ```
/// use delve::{Direction, GridPos};
///
/// let pos = GridPos::new(2, 3);
/// assert_eq!(pos.step(Direction::North), GridPos::new(2, 2));
/// assert_eq!(pos.manhattan_distance(GridPos::new(0, 0)), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Calculates the Manhattan distance to another position.
    pub fn manhattan_distance(self, other: GridPos) -> u32 {
        ((self.x - other.x).abs() + (self.y - other.y).abs()) as u32
    }

    /// The neighbouring cell in `direction`.
    pub fn step(self, direction: Direction) -> GridPos {
        let (dx, dy) = direction.delta();
        GridPos::new(self.x + dx, self.y + dy)
    }

    /// The 4 cardinal neighbours, paired with the direction that reaches them.
    pub fn neighbours(self) -> [(Direction, GridPos); 4] {
        Direction::all().map(|d| (d, self.step(d)))
    }

    /// Direction from `self` to an adjacent `other`, if they touch.
    pub fn direction_to(self, other: GridPos) -> Option<Direction> {
        Direction::all()
            .into_iter()
            .find(|d| self.step(*d) == other)
    }
}

impl std::fmt::Display for GridPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Cardinal directions. Rooms only connect orthogonally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Converts a direction to a grid delta. North is negative y.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::South,
            Direction::East,
            Direction::West,
        ]
    }
}

/// Unique identifier for items and enemies.
pub type EntityId = Uuid;

/// Creates a new unique entity ID.
pub fn new_entity_id() -> EntityId {
    Uuid::new_v4()
}
