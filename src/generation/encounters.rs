//! # Encounter Generation
//!
//! Enemy archetypes, depth-scaled enemy stats, and placement of enemy groups in rooms.

use super::{depth_scale, GenerationConfig, Generator};
use crate::utils::Vec2;
use crate::{config, new_entity_id, DelveError, DelveResult, EntityId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Enemy families. They differ in how they chase and what they do in battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyArchetype {
    /// Slow, tanky melee
    Brute,
    /// Keeps its distance and shoots
    Archer,
    /// Winds up and dashes in a straight line
    Charger,
    /// Hangs back and calls minions in battle
    Summoner,
    /// Summoned helper
    Minion,
}

/// Base stats at depth 1.
struct Profile {
    names: &'static [&'static str],
    health: f64,
    damage: f64,
    defense: f64,
    hit_chance: f64,
    experience: f64,
    gold: f64,
}

impl EnemyArchetype {
    fn profile(self) -> Profile {
        match self {
            EnemyArchetype::Brute => Profile {
                names: &["Ghoul", "Orc Bruiser", "Stone Golem"],
                health: 40.0,
                damage: 7.0,
                defense: 3.0,
                hit_chance: 80.0,
                experience: 20.0,
                gold: 8.0,
            },
            EnemyArchetype::Archer => Profile {
                names: &["Skeleton Archer", "Goblin Slinger"],
                health: 26.0,
                damage: 8.0,
                defense: 1.0,
                hit_chance: 85.0,
                experience: 22.0,
                gold: 9.0,
            },
            EnemyArchetype::Charger => Profile {
                names: &["Boar Rider", "Horned Beast"],
                health: 32.0,
                damage: 10.0,
                defense: 2.0,
                hit_chance: 75.0,
                experience: 25.0,
                gold: 10.0,
            },
            EnemyArchetype::Summoner => Profile {
                names: &["Cultist", "Necromancer"],
                health: 28.0,
                damage: 5.0,
                defense: 1.0,
                hit_chance: 80.0,
                experience: 30.0,
                gold: 12.0,
            },
            EnemyArchetype::Minion => Profile {
                names: &["Bone Minion"],
                health: 12.0,
                damage: 4.0,
                defense: 0.0,
                hit_chance: 75.0,
                experience: 5.0,
                gold: 0.0,
            },
        }
    }

    /// Movement speed in room units per second while chasing.
    pub fn chase_speed(self) -> f32 {
        match self {
            EnemyArchetype::Brute => 70.0,
            EnemyArchetype::Archer => 90.0,
            EnemyArchetype::Charger => 80.0,
            EnemyArchetype::Summoner => 60.0,
            EnemyArchetype::Minion => 110.0,
        }
    }

    /// Distance ranged archetypes try to hold from the player.
    pub fn preferred_range(self) -> Option<f32> {
        match self {
            EnemyArchetype::Archer => Some(160.0),
            EnemyArchetype::Summoner => Some(190.0),
            _ => None,
        }
    }

    /// Archetypes that may appear at `depth`.
    pub fn available_at(depth: u32) -> Vec<EnemyArchetype> {
        let mut list = vec![EnemyArchetype::Brute];
        if depth >= 2 {
            list.push(EnemyArchetype::Archer);
        }
        if depth >= 3 {
            list.push(EnemyArchetype::Charger);
        }
        if depth >= 4 {
            list.push(EnemyArchetype::Summoner);
        }
        list
    }
}

/// A hostile combatant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub id: EntityId,
    pub name: String,
    pub archetype: EnemyArchetype,
    pub depth: u32,
    pub is_boss: bool,
    pub max_health: i32,
    pub health: i32,
    pub damage: i32,
    pub defense: i32,
    pub hit_chance: f64,
    pub experience: u64,
    pub gold: u64,
    /// Where the enemy stands when the room loads
    pub spawn: Vec2,
}

impl Enemy {
    /// An enemy of `archetype` scaled to `depth`, named after the first entry of its family.
    pub fn new(archetype: EnemyArchetype, depth: u32) -> Self {
        let profile = archetype.profile();
        Self::from_profile(&profile, profile.names[0], archetype, depth)
    }

    fn from_profile(profile: &Profile, name: &str, archetype: EnemyArchetype, depth: u32) -> Self {
        let scale = depth_scale(depth);
        let health = (profile.health * scale).round() as i32;
        Self {
            id: new_entity_id(),
            name: name.to_string(),
            archetype,
            depth,
            is_boss: false,
            max_health: health,
            health,
            damage: (profile.damage * scale).round() as i32,
            defense: (profile.defense * scale).round() as i32,
            hit_chance: profile.hit_chance,
            experience: (profile.experience * scale).round() as u64,
            gold: (profile.gold * scale).round() as u64,
            spawn: Vec2::new(config::ROOM_WIDTH / 2.0, config::ROOM_HEIGHT / 4.0),
        }
    }

    /// A random member of `archetype`'s family.
    pub fn random(archetype: EnemyArchetype, depth: u32, rng: &mut StdRng) -> Self {
        let profile = archetype.profile();
        let name = profile.names.choose(rng).copied().unwrap_or("Monster");
        Self::from_profile(&profile, name, archetype, depth)
    }

    /// The depth boss: a heavily scaled brute.
    pub fn boss(depth: u32) -> Self {
        let mut boss = Self::new(EnemyArchetype::Brute, depth);
        boss.name = format!("Warden of Depth {depth}");
        boss.is_boss = true;
        boss.max_health *= 3;
        boss.health = boss.max_health;
        boss.damage = (boss.damage as f64 * 1.5).round() as i32;
        boss.defense += 2;
        boss.hit_chance = 85.0;
        boss.experience *= 5;
        boss.gold *= 5;
        boss
    }

    pub fn with_spawn(mut self, spawn: Vec2) -> Self {
        self.spawn = spawn;
        self
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn health_ratio(&self) -> f64 {
        if self.max_health <= 0 {
            0.0
        } else {
            self.health as f64 / self.max_health as f64
        }
    }

    /// Applies a hit after defense (reduced by `armor_reduction`), with a floor of 1.
    ///
    /// Returns the damage actually taken.
    pub fn take_hit(&mut self, raw: i32, armor_reduction: i32) -> i32 {
        let defense = (self.defense - armor_reduction).max(0);
        let damage = (raw - defense).max(1);
        self.take_true_damage(damage)
    }

    /// Damage that ignores defense (damage over time, chain jumps).
    pub fn take_true_damage(&mut self, amount: i32) -> i32 {
        let before = self.health;
        self.health = (self.health - amount.max(0)).max(0);
        before - self.health
    }
}

/// Places enemy groups in combat and boss rooms.
#[derive(Debug, Clone)]
pub struct EncounterGenerator {
    pub config: GenerationConfig,
}

impl EncounterGenerator {
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }

    /// A random spawn point in the far half of the room, away from the entrance.
    fn spawn_point(rng: &mut StdRng) -> Vec2 {
        Vec2::new(
            rng.gen_range(40.0..config::ROOM_WIDTH - 40.0),
            rng.gen_range(40.0..config::ROOM_HEIGHT * 0.6),
        )
    }

    /// The boss room's occupants: the boss plus, past depth 3, an escort.
    pub fn boss_group(&self, depth: u32, rng: &mut StdRng) -> Vec<Enemy> {
        let mut group = vec![Enemy::boss(depth)
            .with_spawn(Vec2::new(config::ROOM_WIDTH / 2.0, config::ROOM_HEIGHT / 4.0))];
        if depth > 3 {
            let archetypes = EnemyArchetype::available_at(depth);
            for _ in 0..(depth / 4).min(3) {
                let archetype = archetypes
                    .choose(rng)
                    .copied()
                    .unwrap_or(EnemyArchetype::Brute);
                group.push(Enemy::random(archetype, depth, rng).with_spawn(Self::spawn_point(rng)));
            }
        }
        group
    }
}

impl Generator<Vec<Enemy>> for EncounterGenerator {
    fn generate(&self, depth: u32, rng: &mut StdRng) -> DelveResult<Vec<Enemy>> {
        let min = self.config.min_enemies_per_room;
        let max = (self.config.max_enemies_per_room + depth / 5).max(min);
        let count = rng.gen_range(min..=max);
        let archetypes = EnemyArchetype::available_at(depth);

        let group = (0..count)
            .map(|_| {
                let archetype = archetypes
                    .choose(rng)
                    .copied()
                    .unwrap_or(EnemyArchetype::Brute);
                Enemy::random(archetype, depth, rng).with_spawn(Self::spawn_point(rng))
            })
            .collect();
        Ok(group)
    }

    fn validate(&self, content: &Vec<Enemy>) -> DelveResult<()> {
        if content.is_empty() {
            return Err(DelveError::GenerationFailed(
                "encounter has no enemies".to_string(),
            ));
        }
        if content.iter().any(|e| !e.is_alive()) {
            return Err(DelveError::GenerationFailed(
                "encounter contains a dead enemy".to_string(),
            ));
        }
        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "EncounterGenerator"
    }
}
