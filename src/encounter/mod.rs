//! # Encounter Module
//!
//! The real-time layer of a room: the player walking around, enemies noticing and
//! chasing them, hazards and projectiles. Nothing here draws; a renderer reads
//! [`EncounterSnapshot`] and feeds back one [`PlayerIntent`] per tick.
//!
//! Each tick reads the player position once, after the player's own intent, and every
//! enemy decides against that same snapshot. Processing order within the enemy list
//! therefore never changes what an enemy sees.

pub mod ai;
pub mod hazards;
pub mod projectile;

pub use ai::*;
pub use hazards::*;
pub use projectile::*;

use crate::utils::{Rect, Vec2};
use crate::{config, Character, Direction, EntityId, Room};
use hazards::{apply_hazards, HazardSlot};
use log::{debug, info, warn};
use serde::Serialize;

/// One already-debounced input per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerIntent {
    Move(Direction),
    Dash(Direction),
    Interact,
    Push(Direction),
    Pause,
}

/// Things the caller must react to.
#[derive(Debug, Clone, PartialEq)]
pub enum EncounterEvent {
    /// An enemy reached the player. Other enemies within reach join later by zone.
    BattleStarted {
        initiator: EntityId,
        reinforcements: Vec<(EntityId, u8)>,
    },
    HazardDamage {
        hit: HazardHit,
    },
    ProjectileHit {
        source: EntityId,
        damage: i32,
    },
    Interacted {
        position: Vec2,
    },
    PlayerDefeated,
    PauseToggled {
        paused: bool,
    },
}

fn direction_vector(direction: Direction) -> Vec2 {
    let (dx, dy) = direction.delta();
    Vec2::new(dx as f32, dy as f32)
}

/// Reinforcement zone for an enemy `distance` away from the fight, if it is close enough.
///
/// # Examples
///
/// ```
/// use delve::reinforcement_zone;
///
/// assert_eq!(reinforcement_zone(0.0), Some(1));
/// assert_eq!(reinforcement_zone(130.0), Some(2));
/// assert_eq!(reinforcement_zone(10_000.0), None);
/// ```
pub fn reinforcement_zone(distance: f32) -> Option<u8> {
    let zone = (distance / config::ZONE_WIDTH).ceil().max(1.0);
    if zone > config::MAX_REINFORCEMENT_ZONE as f32 {
        None
    } else {
        Some(zone as u8)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerView {
    pub position: Vec2,
    pub facing: Direction,
    pub dashing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentView {
    pub id: EntityId,
    pub archetype: crate::EnemyArchetype,
    pub position: Vec2,
    pub state: AiState,
}

/// Read-only view of a room for presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncounterSnapshot {
    pub player: PlayerView,
    pub enemies: Vec<AgentView>,
    pub hazards: Vec<Hazard>,
    pub projectiles: Vec<Vec2>,
    pub paused: bool,
    pub battle_active: bool,
}

/// The live state of the room the player is standing in.
#[derive(Debug, Clone)]
pub struct RoomEncounter {
    bounds: Rect,
    player: Vec2,
    facing: Direction,
    dash: Option<Motion>,
    agents: Vec<EnemyAgent>,
    hazards: Vec<HazardSlot>,
    projectiles: Vec<Projectile>,
    invulnerable_until_ms: u64,
    paused: bool,
    battle_active: bool,
}

impl RoomEncounter {
    pub fn new(bounds: Rect, player: Vec2, agents: Vec<EnemyAgent>, hazards: Vec<Hazard>) -> Self {
        Self {
            bounds,
            player: bounds.clamp(player),
            facing: Direction::North,
            dash: None,
            agents,
            hazards: hazards.into_iter().map(HazardSlot::new).collect(),
            projectiles: Vec::new(),
            invulnerable_until_ms: 0,
            paused: false,
            battle_active: false,
        }
    }

    /// The encounter for a room, with the player at the south entrance.
    pub fn for_room(room: &Room) -> Self {
        let bounds = Rect::new(0.0, 0.0, config::ROOM_WIDTH, config::ROOM_HEIGHT);
        let agents = room.enemies().iter().map(EnemyAgent::from_enemy).collect();
        Self::new(bounds, Self::entrance(), agents, room.hazards().to_vec())
    }

    /// Where the player appears when entering a room.
    pub fn entrance() -> Vec2 {
        Vec2::new(config::ROOM_WIDTH / 2.0, config::ROOM_HEIGHT - 40.0)
    }

    pub fn player_position(&self) -> Vec2 {
        self.player
    }

    pub fn set_player_position(&mut self, position: Vec2) {
        self.player = self.bounds.clamp(position);
        self.dash = None;
    }

    pub fn agents(&self) -> &[EnemyAgent] {
        &self.agents
    }

    pub fn agent(&self, id: EntityId) -> Option<&EnemyAgent> {
        self.agents.iter().find(|a| a.enemy_id == id)
    }

    pub fn is_battle_active(&self) -> bool {
        self.battle_active
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Every enemy in the room has been defeated.
    pub fn is_cleared(&self) -> bool {
        self.agents.iter().all(|a| a.state() == AiState::Defeated)
    }

    /// Advances the room by one tick.
    ///
    /// Order: player intent, player snapshot, hazards, projectiles, then each enemy
    /// against the snapshot. Does nothing while paused or while a battle is running.
    pub fn tick(
        &mut self,
        intent: Option<PlayerIntent>,
        now_ms: u64,
        dt_secs: f32,
        character: &mut Character,
    ) -> Vec<EncounterEvent> {
        let mut events = Vec::new();
        if intent == Some(PlayerIntent::Pause) {
            self.paused = !self.paused;
            events.push(EncounterEvent::PauseToggled {
                paused: self.paused,
            });
            return events;
        }
        if self.paused {
            return events;
        }
        if self.battle_active {
            warn!("Room tick ignored while a battle is in progress");
            return events;
        }
        if !character.is_alive() {
            return events;
        }
        character.advance_clock(now_ms);

        if let Some(event) = self.apply_intent(intent, dt_secs) {
            events.push(event);
        }
        let snapshot = self.player;

        let (hits, until) = apply_hazards(
            &mut self.hazards,
            snapshot,
            now_ms,
            dt_secs,
            self.invulnerable_until_ms,
            character,
        );
        self.invulnerable_until_ms = until;
        events.extend(hits.into_iter().map(|hit| EncounterEvent::HazardDamage { hit }));

        let bounds = self.bounds;
        let mut landed = Vec::new();
        self.projectiles
            .retain_mut(|p| match p.advance(dt_secs, snapshot, &bounds) {
                ProjectileFate::InFlight => true,
                ProjectileFate::HitPlayer => {
                    landed.push((p.source, p.damage));
                    false
                }
                ProjectileFate::Expired => false,
            });
        for (source, raw) in landed {
            if character.is_alive() {
                let damage = character.receive_hit(raw, now_ms);
                events.push(EncounterEvent::ProjectileHit { source, damage });
            }
        }

        if !character.is_alive() {
            info!("{} fell to the room's dangers", character.name);
            events.push(EncounterEvent::PlayerDefeated);
            return events;
        }

        let mut initiator = None;
        for agent in self.agents.iter_mut() {
            match agent.update(snapshot, now_ms, dt_secs, &bounds) {
                AgentAction::Engage if initiator.is_none() => initiator = Some(agent.enemy_id),
                AgentAction::Fire(projectile) => self.projectiles.push(projectile),
                _ => {}
            }
        }

        if let Some(initiator) = initiator {
            events.push(self.start_battle(initiator));
        }
        events
    }

    fn apply_intent(&mut self, intent: Option<PlayerIntent>, dt_secs: f32) -> Option<EncounterEvent> {
        if let Some(mut motion) = self.dash.take() {
            self.player = motion.advance(dt_secs);
            if !motion.is_done() {
                self.dash = Some(motion);
            }
            return None;
        }
        match intent? {
            PlayerIntent::Move(direction) => {
                self.facing = direction;
                let step = direction_vector(direction).scale(config::PLAYER_SPEED * dt_secs);
                self.player = self.bounds.clamp(self.player + step);
                None
            }
            PlayerIntent::Dash(direction) => {
                self.facing = direction;
                let target = self.bounds.clamp(
                    self.player + direction_vector(direction).scale(config::PLAYER_DASH_DISTANCE),
                );
                let mut motion = Motion::new(self.player, target, config::PLAYER_DASH_SECS);
                self.player = motion.advance(dt_secs);
                if !motion.is_done() {
                    self.dash = Some(motion);
                }
                None
            }
            PlayerIntent::Push(direction) => {
                self.facing = direction;
                let player = self.player;
                let push = direction_vector(direction);
                let bounds = self.bounds;
                let target = self
                    .agents
                    .iter_mut()
                    .filter(|a| a.is_available())
                    .filter(|a| a.position.distance(player) <= config::PUSH_RADIUS)
                    .min_by(|a, b| {
                        a.position
                            .distance(player)
                            .total_cmp(&b.position.distance(player))
                    });
                if let Some(agent) = target {
                    agent.shove(push, &bounds);
                }
                None
            }
            PlayerIntent::Interact => Some(EncounterEvent::Interacted {
                position: self.player,
            }),
            PlayerIntent::Pause => None,
        }
    }

    /// Engages every available enemy within the reinforcement zones of the initiator.
    fn start_battle(&mut self, initiator: EntityId) -> EncounterEvent {
        let origin = self
            .agent(initiator)
            .map(|a| a.position)
            .unwrap_or(self.player);
        let mut reinforcements = Vec::new();
        for agent in self.agents.iter_mut() {
            if agent.enemy_id == initiator {
                continue;
            }
            let joining = agent.is_available() || agent.state() == AiState::InCombat;
            if !joining {
                continue;
            }
            if let Some(zone) = reinforcement_zone(agent.position.distance(origin)) {
                agent.engage();
                reinforcements.push((agent.enemy_id, zone));
            }
        }
        self.battle_active = true;
        self.projectiles.clear();
        info!(
            "Battle started by {} with {} reinforcements",
            initiator,
            reinforcements.len()
        );
        EncounterEvent::BattleStarted {
            initiator,
            reinforcements,
        }
    }

    /// Forces a battle with the nearest available enemy, as when an ability is used on it.
    pub fn engage_nearest(&mut self) -> Option<EncounterEvent> {
        if self.battle_active {
            return None;
        }
        let player = self.player;
        let nearest = self
            .agents
            .iter_mut()
            .filter(|a| a.is_available())
            .min_by(|a, b| {
                a.position
                    .distance(player)
                    .total_cmp(&b.position.distance(player))
            })?;
        nearest.engage();
        let id = nearest.enemy_id;
        Some(self.start_battle(id))
    }

    /// The player fled: every engaged enemy goes home and cools down.
    pub fn flee(&mut self, now_ms: u64) {
        if !self.battle_active {
            warn!("Flee requested with no battle in progress");
        }
        for agent in self.agents.iter_mut() {
            agent.flee_from(now_ms);
        }
        self.battle_active = false;
        self.player = Self::entrance();
        debug!("Player fled to the room entrance");
    }

    /// The battle ended with `ids` dead. Survivors that were engaged go back to cooldown.
    pub fn resolve_defeated(&mut self, ids: &[EntityId], now_ms: u64) {
        for agent in self.agents.iter_mut() {
            if ids.contains(&agent.enemy_id) {
                agent.defeat();
            } else {
                agent.flee_from(now_ms);
            }
        }
        self.battle_active = false;
    }

    pub fn snapshot(&self) -> EncounterSnapshot {
        EncounterSnapshot {
            player: PlayerView {
                position: self.player,
                facing: self.facing,
                dashing: self.dash.is_some(),
            },
            enemies: self
                .agents
                .iter()
                .map(|a| AgentView {
                    id: a.enemy_id,
                    archetype: a.archetype,
                    position: a.position,
                    state: a.state(),
                })
                .collect(),
            hazards: self.hazards.iter().map(|s| s.hazard.clone()).collect(),
            projectiles: self.projectiles.iter().map(|p| p.position).collect(),
            paused: self.paused,
            battle_active: self.battle_active,
        }
    }
}
