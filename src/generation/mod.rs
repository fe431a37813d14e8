//! # Generation Module
//!
//! Procedural content generation for dungeons, enemies, and loot.
//!
//! Every generator takes a depth and a caller-supplied [`StdRng`], so the same seed
//! reproduces the same dungeon. Structural problems (a disconnected layout, a missing
//! boss) are caught by [`Generator::validate`] and the candidate is regenerated rather
//! than handed to the caller.

pub mod dungeon;
pub mod encounters;
pub mod items;

pub use dungeon::*;
pub use encounters::*;
pub use items::*;

use crate::DelveResult;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Configuration for procedural generation.
///
/// Controls map size, room counts per depth, and how densely rooms are populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Random seed for reproducible generation
    pub seed: u64,
    /// Grid width in rooms
    pub grid_width: i32,
    /// Grid height in rooms
    pub grid_height: i32,
    /// Rooms placed at depth 2
    pub base_rooms: u32,
    /// Extra rooms per depth beyond 2
    pub rooms_per_depth: f64,
    /// Hard cap on rooms per map
    pub max_rooms: u32,
    /// Probability of an extra loop connection per eligible pair (0.0 to 1.0)
    pub extra_connection_chance: f64,
    /// Candidates tried before generation gives up
    pub max_generation_attempts: u32,
    /// Enemies per combat room
    pub min_enemies_per_room: u32,
    pub max_enemies_per_room: u32,
    /// First depth at which combat rooms may contain hazards
    pub hazard_min_depth: u32,
    /// Probability that an eligible combat room gets hazards
    pub hazard_chance: f64,
}

impl GenerationConfig {
    /// Creates a default generation configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::GenerationConfig;
    ///
    /// let config = GenerationConfig::new(7);
    /// assert_eq!(config.seed, 7);
    /// assert!(config.max_rooms as i32 <= config.grid_width * config.grid_height);
    /// ```
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            grid_width: 9,
            grid_height: 9,
            base_rooms: 8,
            rooms_per_depth: 1.0,
            max_rooms: 22,
            extra_connection_chance: 0.15,
            max_generation_attempts: 25,
            min_enemies_per_room: 1,
            max_enemies_per_room: 4,
            hazard_min_depth: 3,
            hazard_chance: 0.35,
        }
    }

    /// Creates a configuration for testing with smaller, simpler maps.
    pub fn for_testing(seed: u64) -> Self {
        Self {
            seed,
            grid_width: 7,
            grid_height: 7,
            base_rooms: 6,
            rooms_per_depth: 0.5,
            max_rooms: 12,
            extra_connection_chance: 0.1,
            max_generation_attempts: 25,
            min_enemies_per_room: 1,
            max_enemies_per_room: 2,
            hazard_min_depth: 3,
            hazard_chance: 0.2,
        }
    }

    /// Rooms to place at `depth`, capped by the config and the grid.
    pub fn room_target(&self, depth: u32) -> u32 {
        let extra = (depth.saturating_sub(2) as f64 * self.rooms_per_depth).floor() as u32;
        let grid_cap = (self.grid_width * self.grid_height).max(2) as u32;
        (self.base_rooms + extra)
            .min(self.max_rooms)
            .min(grid_cap)
            .max(2)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(42)
    }
}

/// Trait for procedural generators.
///
/// Implementors own their configuration; callers supply depth and randomness.
pub trait Generator<T> {
    /// Generates content for `depth` using the provided random number generator.
    fn generate(&self, depth: u32, rng: &mut StdRng) -> DelveResult<T>;

    /// Validates that the generated content meets requirements.
    fn validate(&self, content: &T) -> DelveResult<()>;

    /// Gets the generator type name for logging and debugging.
    fn generator_type(&self) -> &'static str;
}

/// Creates a seeded random number generator from the config.
pub fn create_rng(config: &GenerationConfig) -> StdRng {
    StdRng::seed_from_u64(config.seed)
}

/// Multiplier applied to enemy stats and rewards at `depth`.
pub fn depth_scale(depth: u32) -> f64 {
    1.0 + 0.15 * depth.saturating_sub(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_generation_config_creation() {
        let config = GenerationConfig::new(12345);
        assert_eq!(config.seed, 12345);
        assert!(config.min_enemies_per_room <= config.max_enemies_per_room);
        assert!(config.base_rooms <= config.max_rooms);
    }

    #[test]
    fn test_room_target_grows_and_caps() {
        let config = GenerationConfig::new(1);
        assert_eq!(config.room_target(2), 8);
        assert_eq!(config.room_target(5), 11);
        assert_eq!(config.room_target(100), config.max_rooms);
    }

    #[test]
    fn test_rng_is_reproducible() {
        let config = GenerationConfig::new(12345);
        let a: u64 = create_rng(&config).gen();
        let b: u64 = create_rng(&config).gen();
        assert_eq!(a, b);
    }

    #[test]
    fn test_depth_scale() {
        assert_eq!(depth_scale(1), 1.0);
        assert!((depth_scale(3) - 1.3).abs() < 1e-9);
    }
}
