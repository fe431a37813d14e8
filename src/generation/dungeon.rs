//! # Dungeon Generation
//!
//! Builds one depth of the dungeon as a grid of connected rooms.
//!
//! Depth 1 is a fixed tutorial layout. Deeper maps are grown as a spanning tree from a
//! centred START room, so every placed room is reachable by construction. The BOSS takes
//! the leaf farthest from START, a few loop passages are added away from the boss, and
//! room types are rolled from depth-gated weights before payloads are filled in.

use super::{EncounterGenerator, GenerationConfig, Generator, LootGenerator};
use crate::{
    Blessing, DelveError, DelveResult, Direction, DungeonMap, EventKind, GridPos, Hazard, Room,
    RoomPayload, RoomType,
};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

/// Fraction of max health restored by a rest room
const REST_HEAL_FRACTION: f64 = 0.5;

/// Room-grid dungeon generator.
///
/// Owns the encounter and loot generators used to populate rooms.
#[derive(Debug, Clone)]
pub struct RoomGridGenerator {
    pub config: GenerationConfig,
    encounters: EncounterGenerator,
    loot: LootGenerator,
}

impl RoomGridGenerator {
    /// Creates a generator from a configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{GenerationConfig, RoomGridGenerator};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let generator = RoomGridGenerator::new(GenerationConfig::new(1));
    /// let mut rng = StdRng::seed_from_u64(1);
    /// let map = generator.generate_depth(3, &mut rng).unwrap();
    /// assert!(map.is_fully_connected());
    /// assert!(map.boss_position().is_some());
    /// ```
    pub fn new(config: GenerationConfig) -> Self {
        Self {
            encounters: EncounterGenerator::new(config.clone()),
            loot: LootGenerator::new(config.clone()),
            config,
        }
    }

    /// Creates a generator with small maps for tests.
    pub fn for_testing(seed: u64) -> Self {
        Self::new(GenerationConfig::for_testing(seed))
    }

    pub fn loot(&self) -> &LootGenerator {
        &self.loot
    }

    /// Generates and validates the map for `depth`, retrying broken candidates.
    pub fn generate_depth(&self, depth: u32, rng: &mut StdRng) -> DelveResult<DungeonMap> {
        let attempts = self.config.max_generation_attempts.max(1);
        for attempt in 1..=attempts {
            let candidate = if depth <= 1 {
                self.tutorial_layout(rng)
            } else {
                self.grow_layout(depth, rng)
            };
            match candidate.and_then(|map| self.validate(&map).map(|_| map)) {
                Ok(map) => {
                    debug!(
                        "Generated depth {} with {} rooms on attempt {}",
                        depth,
                        map.room_count(),
                        attempt
                    );
                    return Ok(map);
                }
                Err(e) => warn!("Depth {} attempt {} discarded: {}", depth, attempt, e),
            }
        }
        Err(DelveError::GenerationFailed(format!(
            "no valid map for depth {depth} after {attempts} attempts"
        )))
    }

    /// The fixed depth-1 layout:
    ///
    /// ```text
    ///         T
    ///         |
    ///     S - C - C - B
    ///             |
    ///             R
    /// ```
    fn tutorial_layout(&self, rng: &mut StdRng) -> DelveResult<DungeonMap> {
        if self.config.grid_width < 5 || self.config.grid_height < 3 {
            return Err(DelveError::GenerationFailed(
                "tutorial layout needs a grid of at least 5x3".to_string(),
            ));
        }
        let row = self.config.grid_height / 2;
        let start = GridPos::new(1, row);
        let first_fight = GridPos::new(2, row);
        let treasure = GridPos::new(2, row - 1);
        let second_fight = GridPos::new(3, row);
        let rest = GridPos::new(3, row + 1);
        let boss = GridPos::new(4, row);

        let mut map = DungeonMap::new(
            self.config.grid_width,
            self.config.grid_height,
            1,
            Room::new(start, RoomType::Start),
        )?;
        map.place(Room::new(first_fight, RoomType::Combat))?;
        map.place(Room::new(treasure, RoomType::Treasure))?;
        map.place(Room::new(second_fight, RoomType::Combat))?;
        map.place(Room::new(rest, RoomType::Rest))?;
        map.place(Room::new(boss, RoomType::Boss))?;

        map.connect(start, Direction::East, first_fight)?;
        map.connect(first_fight, Direction::North, treasure)?;
        map.connect(first_fight, Direction::East, second_fight)?;
        map.connect(second_fight, Direction::South, rest)?;
        map.connect(second_fight, Direction::East, boss)?;

        self.populate(&mut map, 1, rng)?;
        map.enter_start();
        Ok(map)
    }

    /// Random spanning-tree growth for depths past the tutorial.
    fn grow_layout(&self, depth: u32, rng: &mut StdRng) -> DelveResult<DungeonMap> {
        let target = self.config.room_target(depth) as usize;
        let centre = GridPos::new(self.config.grid_width / 2, self.config.grid_height / 2);
        let mut map = DungeonMap::new(
            self.config.grid_width,
            self.config.grid_height,
            depth,
            Room::new(centre, RoomType::Start),
        )?;

        let mut placed = vec![centre];
        while placed.len() < target {
            let frontier: Vec<(GridPos, Direction, GridPos)> = placed
                .iter()
                .flat_map(|from| from.neighbours().map(|(dir, to)| (*from, dir, to)))
                .filter(|(_, _, to)| map.in_bounds(*to) && !map.is_occupied(*to))
                .collect();
            let Some(&(from, dir, to)) = frontier.choose(rng) else {
                break;
            };
            map.place(Room::new(to, RoomType::Empty))?;
            map.connect(from, dir, to)?;
            placed.push(to);
        }
        if placed.len() < 2 {
            return Err(DelveError::GenerationFailed(
                "grid too small for a boss room".to_string(),
            ));
        }

        let boss = self.farthest_leaf(&map, centre).ok_or_else(|| {
            DelveError::GenerationFailed("spanning tree has no leaf for the boss".to_string())
        })?;
        if let Some(room) = map.room_mut(boss) {
            room.room_type = RoomType::Boss;
        }

        self.add_loops(&mut map, &placed, boss, rng)?;

        for pos in &placed {
            if *pos == centre || *pos == boss {
                continue;
            }
            let room_type = self.roll_room_type(depth, rng)?;
            if let Some(room) = map.room_mut(*pos) {
                room.room_type = room_type;
            }
        }

        self.populate(&mut map, depth, rng)?;
        map.enter_start();
        Ok(map)
    }

    /// The dead end with the longest route from START. Ties go to the lowest position.
    fn farthest_leaf(&self, map: &DungeonMap, start: GridPos) -> Option<GridPos> {
        let distances = map.distances_from(start);
        map.rooms()
            .filter(|room| room.pos != start && room.exit_count() == 1)
            .filter_map(|room| distances.get(&room.pos).map(|d| (*d, room.pos)))
            .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
            .map(|(_, pos)| pos)
    }

    /// Extra passages between adjacent rooms. The boss room stays a dead end.
    fn add_loops(
        &self,
        map: &mut DungeonMap,
        placed: &[GridPos],
        boss: GridPos,
        rng: &mut StdRng,
    ) -> DelveResult<()> {
        for &pos in placed {
            if pos == boss {
                continue;
            }
            for dir in [Direction::East, Direction::South] {
                let next = pos.step(dir);
                let already_linked = map
                    .room(pos)
                    .is_some_and(|room| room.neighbour(dir).is_some());
                if next == boss || !map.is_occupied(next) || already_linked {
                    continue;
                }
                if rng.gen_bool(self.config.extra_connection_chance.clamp(0.0, 1.0)) {
                    map.connect(pos, dir, next)?;
                }
            }
        }
        Ok(())
    }

    /// Combat-heavy weights. Utility rooms open up with depth.
    fn roll_room_type(&self, depth: u32, rng: &mut StdRng) -> DelveResult<RoomType> {
        let mut weights = vec![
            (RoomType::Combat, 55),
            (RoomType::Treasure, 12),
            (RoomType::Empty, 8),
        ];
        if depth >= 2 {
            weights.push((RoomType::Rest, 8));
            weights.push((RoomType::Event, 6));
        }
        if depth >= 3 {
            weights.push((RoomType::Shop, 7));
        }
        if depth >= 4 {
            weights.push((RoomType::Shrine, 5));
        }
        weights
            .choose_weighted(rng, |(_, weight)| *weight)
            .map(|(room_type, _)| *room_type)
            .map_err(|e| DelveError::GenerationFailed(format!("room type roll failed: {e}")))
    }

    /// Fills every room with the payload its type calls for.
    fn populate(&self, map: &mut DungeonMap, depth: u32, rng: &mut StdRng) -> DelveResult<()> {
        let rooms: Vec<(GridPos, RoomType)> =
            map.rooms().map(|room| (room.pos, room.room_type)).collect();
        for (pos, room_type) in rooms {
            let payload = match room_type {
                RoomType::Combat => {
                    let enemies = self.encounters.generate(depth, rng)?;
                    self.encounters.validate(&enemies)?;
                    let hazards = if depth >= self.config.hazard_min_depth
                        && rng.gen_bool(self.config.hazard_chance.clamp(0.0, 1.0))
                    {
                        Hazard::scatter(depth, rng)
                    } else {
                        Vec::new()
                    };
                    RoomPayload::Hostile { enemies, hazards }
                }
                RoomType::Boss => RoomPayload::Hostile {
                    enemies: self.encounters.boss_group(depth, rng),
                    hazards: Vec::new(),
                },
                RoomType::Treasure => {
                    let treasure = self.loot.generate(depth, rng)?;
                    self.loot.validate(&treasure)?;
                    RoomPayload::Treasure(treasure)
                }
                RoomType::Shop => RoomPayload::Shop(self.loot.shop_stock(depth, rng)),
                RoomType::Rest => RoomPayload::Rest {
                    heal_fraction: REST_HEAL_FRACTION,
                },
                RoomType::Shrine => RoomPayload::Shrine(
                    Blessing::all()
                        .choose(rng)
                        .copied()
                        .unwrap_or(Blessing::Might),
                ),
                RoomType::Event => RoomPayload::Event(
                    EventKind::all()
                        .choose(rng)
                        .copied()
                        .unwrap_or(EventKind::HealingFountain),
                ),
                RoomType::Start | RoomType::Empty => RoomPayload::Nothing,
            };
            if let Some(room) = map.room_mut(pos) {
                room.payload = payload;
            }
        }
        Ok(())
    }
}

impl Default for RoomGridGenerator {
    fn default() -> Self {
        Self::new(GenerationConfig::default())
    }
}

impl Generator<DungeonMap> for RoomGridGenerator {
    fn generate(&self, depth: u32, rng: &mut StdRng) -> DelveResult<DungeonMap> {
        self.generate_depth(depth, rng)
    }

    fn validate(&self, map: &DungeonMap) -> DelveResult<()> {
        let starts = map.count_of(RoomType::Start);
        let bosses = map.count_of(RoomType::Boss);
        if starts != 1 || bosses != 1 {
            return Err(DelveError::GenerationFailed(format!(
                "expected one start and one boss, found {starts} and {bosses}"
            )));
        }
        if !map.connections_are_mutual() {
            return Err(DelveError::GenerationFailed(
                "one-way connection in map".to_string(),
            ));
        }
        if !map.is_fully_connected() {
            let orphans = map.room_count() - map.reachable_from_start().len();
            return Err(DelveError::GenerationFailed(format!(
                "{orphans} rooms unreachable from start"
            )));
        }
        let boss_is_dead_end = map
            .boss_position()
            .and_then(|pos| map.room(pos))
            .is_some_and(|room| room.exit_count() == 1);
        if !boss_is_dead_end {
            return Err(DelveError::GenerationFailed(
                "boss room must be a dead end".to_string(),
            ));
        }
        let boss_has_enemies = map
            .boss_position()
            .and_then(|pos| map.room(pos))
            .is_some_and(|room| !room.enemies().is_empty());
        if !boss_has_enemies {
            return Err(DelveError::GenerationFailed(
                "boss room is empty".to_string(),
            ));
        }
        if map.current_position() != map.start_position() {
            return Err(DelveError::GenerationFailed(
                "player does not begin in the start room".to_string(),
            ));
        }
        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "RoomGridGenerator"
    }
}
