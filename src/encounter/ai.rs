//! Per-enemy AI for the room layer.
//!
//! Every agent runs the same state machine:
//!
//! ```text
//! Idle -> Chasing -> InCombat -> (battle won)  -> Defeated
//!            |           \----> (player fled) -> Cooldown -> Idle
//!            \--> Idle (player left vision before engaging)
//! ```
//!
//! Archetypes only differ in how they move while chasing.

use super::projectile::Projectile;
use crate::utils::{Rect, Vec2};
use crate::{config, Enemy, EnemyArchetype, EntityId};
use serde::Serialize;

/// Time between archer shots
pub const ARCHER_SHOT_COOLDOWN_MS: u64 = 1_500;

/// Distance at which a charger commits to a dash
pub const CHARGE_TRIGGER_RANGE: f32 = 200.0;

/// Length of a charger's dash
pub const CHARGE_DISTANCE: f32 = 240.0;

/// Seconds a dash takes
pub const CHARGE_SECS: f32 = 0.4;

/// Charger recovery after a dash
pub const CHARGE_RECOVERY_MS: u64 = 1_200;

/// Slack around a ranged enemy's preferred distance
const RANGE_TOLERANCE: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AiState {
    Idle,
    Chasing,
    InCombat,
    /// Cannot re-engage until `until_ms`
    Cooldown {
        until_ms: u64,
    },
    Defeated,
}

/// A straight-line movement spread over several ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Motion {
    pub from: Vec2,
    pub to: Vec2,
    /// Completed fraction in `[0, 1]`
    pub progress: f32,
    duration_secs: f32,
}

impl Motion {
    pub fn new(from: Vec2, to: Vec2, duration_secs: f32) -> Self {
        Self {
            from,
            to,
            progress: 0.0,
            duration_secs: duration_secs.max(f32::EPSILON),
        }
    }

    /// Advances by `dt_secs` and returns the new position.
    pub fn advance(&mut self, dt_secs: f32) -> Vec2 {
        self.progress = (self.progress + dt_secs / self.duration_secs).min(1.0);
        self.from.lerp(self.to, self.progress)
    }

    pub fn is_done(&self) -> bool {
        self.progress >= 1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
enum ChargePhase {
    Ready,
    Dashing(Motion),
    Recovering { until_ms: u64 },
}

/// What an agent wants the encounter to do after its update.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentAction {
    None,
    Engage,
    Fire(Projectile),
}

/// Spatial stand-in for one enemy in the room.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnemyAgent {
    pub enemy_id: EntityId,
    pub archetype: EnemyArchetype,
    pub position: Vec2,
    /// Where the agent stood when its last battle began
    anchor: Vec2,
    state: AiState,
    damage: i32,
    next_shot_ms: u64,
    charge: ChargePhase,
    /// Knockback from a player push
    shove: Option<Motion>,
}

impl EnemyAgent {
    pub fn new(enemy_id: EntityId, archetype: EnemyArchetype, position: Vec2, damage: i32) -> Self {
        Self {
            enemy_id,
            archetype,
            position,
            anchor: position,
            state: AiState::Idle,
            damage,
            next_shot_ms: 0,
            charge: ChargePhase::Ready,
            shove: None,
        }
    }

    pub fn from_enemy(enemy: &Enemy) -> Self {
        Self::new(enemy.id, enemy.archetype, enemy.spawn, enemy.damage)
    }

    pub fn state(&self) -> AiState {
        self.state
    }

    /// Agents that can still notice the player or be pulled into a battle.
    pub fn is_available(&self) -> bool {
        matches!(self.state, AiState::Idle | AiState::Chasing)
    }

    pub fn is_dashing(&self) -> bool {
        matches!(self.charge, ChargePhase::Dashing(_))
    }

    /// Pulls the agent into a battle, remembering where it stood.
    pub fn engage(&mut self) {
        if self.state == AiState::Defeated {
            return;
        }
        self.anchor = self.position;
        self.state = AiState::InCombat;
        self.charge = ChargePhase::Ready;
        self.shove = None;
    }

    /// The player fled: back to the pre-battle spot and wait out the cooldown.
    pub fn flee_from(&mut self, now_ms: u64) {
        if self.state != AiState::InCombat {
            return;
        }
        self.position = self.anchor;
        self.state = AiState::Cooldown {
            until_ms: now_ms + config::CHASE_COOLDOWN_MS,
        };
    }

    pub fn defeat(&mut self) {
        self.state = AiState::Defeated;
        self.charge = ChargePhase::Ready;
        self.shove = None;
    }

    /// Starts a knockback along `direction`.
    pub fn shove(&mut self, direction: Vec2, bounds: &Rect) {
        if matches!(self.state, AiState::Defeated | AiState::InCombat) {
            return;
        }
        let target = bounds.clamp(self.position + direction.normalized().scale(config::PUSH_DISTANCE));
        self.shove = Some(Motion::new(self.position, target, 0.2));
        self.charge = ChargePhase::Ready;
    }

    /// One AI step against the tick's player snapshot.
    pub fn update(&mut self, player: Vec2, now_ms: u64, dt_secs: f32, bounds: &Rect) -> AgentAction {
        if let Some(mut motion) = self.shove.take() {
            self.position = motion.advance(dt_secs);
            if !motion.is_done() {
                self.shove = Some(motion);
            }
            return AgentAction::None;
        }

        match self.state {
            AiState::Defeated | AiState::InCombat => AgentAction::None,
            AiState::Cooldown { until_ms } => {
                if now_ms >= until_ms {
                    self.state = AiState::Idle;
                }
                AgentAction::None
            }
            AiState::Idle => {
                if self.position.distance(player) <= config::VISION_RADIUS {
                    self.state = AiState::Chasing;
                }
                AgentAction::None
            }
            AiState::Chasing => {
                let distance = self.position.distance(player);
                if distance <= config::ENGAGE_RADIUS {
                    self.engage();
                    return AgentAction::Engage;
                }
                if distance > config::VISION_RADIUS && !self.is_dashing() {
                    self.state = AiState::Idle;
                    return AgentAction::None;
                }
                self.chase(player, distance, now_ms, dt_secs, bounds)
            }
        }
    }

    fn chase(
        &mut self,
        player: Vec2,
        distance: f32,
        now_ms: u64,
        dt_secs: f32,
        bounds: &Rect,
    ) -> AgentAction {
        let step = self.archetype.chase_speed() * dt_secs;
        match self.archetype {
            EnemyArchetype::Brute | EnemyArchetype::Minion => {
                self.position = self.position.move_towards(player, step);
                AgentAction::None
            }
            EnemyArchetype::Archer | EnemyArchetype::Summoner => {
                let preferred = self.archetype.preferred_range().unwrap_or(0.0);
                if distance > preferred + RANGE_TOLERANCE {
                    self.position = self.position.move_towards(player, step);
                } else if distance < preferred - RANGE_TOLERANCE {
                    let away = (self.position - player).normalized().scale(step);
                    self.position = bounds.clamp(self.position + away);
                }
                if self.archetype == EnemyArchetype::Archer && now_ms >= self.next_shot_ms {
                    self.next_shot_ms = now_ms + ARCHER_SHOT_COOLDOWN_MS;
                    return AgentAction::Fire(Projectile::aimed(
                        self.enemy_id,
                        self.position,
                        player,
                        self.damage,
                    ));
                }
                AgentAction::None
            }
            EnemyArchetype::Charger => {
                self.charge_step(player, distance, now_ms, dt_secs, bounds);
                AgentAction::None
            }
        }
    }

    /// Chargers walk in, then commit to a dash that ignores the player until it ends.
    fn charge_step(&mut self, player: Vec2, distance: f32, now_ms: u64, dt_secs: f32, bounds: &Rect) {
        match self.charge {
            ChargePhase::Ready => {
                if distance <= CHARGE_TRIGGER_RANGE {
                    let heading = (player - self.position).normalized();
                    let target = bounds.clamp(self.position + heading.scale(CHARGE_DISTANCE));
                    self.charge = ChargePhase::Dashing(Motion::new(self.position, target, CHARGE_SECS));
                } else {
                    let step = self.archetype.chase_speed() * dt_secs;
                    self.position = self.position.move_towards(player, step);
                }
            }
            ChargePhase::Dashing(mut motion) => {
                self.position = motion.advance(dt_secs);
                self.charge = if motion.is_done() {
                    ChargePhase::Recovering {
                        until_ms: now_ms + CHARGE_RECOVERY_MS,
                    }
                } else {
                    ChargePhase::Dashing(motion)
                };
            }
            ChargePhase::Recovering { until_ms } => {
                if now_ms >= until_ms {
                    self.charge = ChargePhase::Ready;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::new_entity_id;

    fn room() -> Rect {
        Rect::new(0.0, 0.0, config::ROOM_WIDTH, config::ROOM_HEIGHT)
    }

    fn agent(archetype: EnemyArchetype, at: Vec2) -> EnemyAgent {
        EnemyAgent::new(new_entity_id(), archetype, at, 8)
    }

    #[test]
    fn test_vision_and_engagement() {
        let mut brute = agent(EnemyArchetype::Brute, Vec2::new(100.0, 100.0));
        let far = Vec2::new(600.0, 400.0);
        assert_eq!(brute.update(far, 0, 0.1, &room()), AgentAction::None);
        assert_eq!(brute.state(), AiState::Idle);

        let near = Vec2::new(250.0, 100.0);
        brute.update(near, 100, 0.1, &room());
        assert_eq!(brute.state(), AiState::Chasing);

        // Player walks away before contact.
        brute.update(far, 200, 0.1, &room());
        assert_eq!(brute.state(), AiState::Idle);

        brute.update(near, 300, 0.1, &room());
        let mut engaged = false;
        for step in 0..100 {
            if brute.update(near, 400 + step * 100, 0.1, &room()) == AgentAction::Engage {
                engaged = true;
                break;
            }
        }
        assert!(engaged);
        assert_eq!(brute.state(), AiState::InCombat);
    }

    #[test]
    fn test_flee_returns_home_and_cools_down() {
        let mut brute = agent(EnemyArchetype::Brute, Vec2::new(100.0, 100.0));
        brute.position = Vec2::new(130.0, 100.0);
        brute.engage();
        brute.position = Vec2::new(300.0, 300.0);
        brute.flee_from(1_000);
        assert_eq!(brute.position, Vec2::new(130.0, 100.0));
        assert_eq!(
            brute.state(),
            AiState::Cooldown {
                until_ms: 1_000 + config::CHASE_COOLDOWN_MS
            }
        );

        let player = Vec2::new(140.0, 100.0);
        brute.update(player, 2_000, 0.1, &room());
        assert!(matches!(brute.state(), AiState::Cooldown { .. }));
        brute.update(player, 1_000 + config::CHASE_COOLDOWN_MS, 0.1, &room());
        assert_eq!(brute.state(), AiState::Idle);
    }

    #[test]
    fn test_archer_keeps_distance_and_fires() {
        let mut archer = agent(EnemyArchetype::Archer, Vec2::new(300.0, 200.0));
        let player = Vec2::new(380.0, 200.0);
        archer.update(player, 0, 0.1, &room());
        let action = archer.update(player, 100, 0.1, &room());
        assert!(matches!(action, AgentAction::Fire(_)));
        assert!(archer.position.x < 300.0);

        // Shot is on cooldown.
        let action = archer.update(player, 200, 0.1, &room());
        assert_eq!(action, AgentAction::None);
    }

    #[test]
    fn test_charger_commits_to_dash() {
        let mut charger = agent(EnemyArchetype::Charger, Vec2::new(100.0, 240.0));
        let player = Vec2::new(250.0, 240.0);
        charger.update(player, 0, 0.1, &room());
        charger.update(player, 100, 0.1, &room());
        assert!(charger.is_dashing());

        // The dash keeps its heading even when the player sidesteps.
        let sidestep = Vec2::new(250.0, 100.0);
        charger.update(sidestep, 200, 0.1, &room());
        assert_eq!(charger.position.y, 240.0);
        assert!(charger.position.x > 100.0);
    }

    #[test]
    fn test_defeated_agents_stay_put() {
        let mut brute = agent(EnemyArchetype::Brute, Vec2::new(100.0, 100.0));
        brute.defeat();
        brute.engage();
        assert_eq!(brute.state(), AiState::Defeated);
        assert_eq!(
            brute.update(Vec2::new(100.0, 100.0), 0, 0.1, &room()),
            AgentAction::None
        );
    }
}
