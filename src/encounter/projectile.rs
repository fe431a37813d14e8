//! Projectiles fired by ranged enemies.

use crate::utils::{Rect, Vec2};
use crate::{config, EntityId};
use serde::Serialize;

/// Projectile travel speed in room units per second
pub const PROJECTILE_SPEED: f32 = 260.0;

/// Distance a projectile flies before it fizzles
pub const PROJECTILE_RANGE: f32 = 420.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projectile {
    pub source: EntityId,
    pub position: Vec2,
    velocity: Vec2,
    pub damage: i32,
    travelled: f32,
}

/// What happened to a projectile this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileFate {
    InFlight,
    HitPlayer,
    Expired,
}

impl Projectile {
    /// Fires from `from` toward `target`. A zero-length aim fires straight down.
    pub fn aimed(source: EntityId, from: Vec2, target: Vec2, damage: i32) -> Self {
        let mut direction = (target - from).normalized();
        if direction == Vec2::ZERO {
            direction = Vec2::new(0.0, 1.0);
        }
        Self {
            source,
            position: from,
            velocity: direction.scale(PROJECTILE_SPEED),
            damage,
            travelled: 0.0,
        }
    }

    /// Moves the projectile and checks it against the player snapshot.
    pub fn advance(&mut self, dt_secs: f32, player: Vec2, bounds: &Rect) -> ProjectileFate {
        let step = self.velocity.scale(dt_secs);
        self.position = self.position + step;
        self.travelled += step.length();

        if self.position.distance(player) <= config::PLAYER_RADIUS {
            ProjectileFate::HitPlayer
        } else if self.travelled >= PROJECTILE_RANGE || !bounds.contains(self.position) {
            ProjectileFate::Expired
        } else {
            ProjectileFate::InFlight
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

    #[test]
    fn test_projectile_hits_player_in_path() {
        let mut arrow = Projectile::aimed(
            new_entity_id(),
            Vec2::new(100.0, 100.0),
            Vec2::new(100.0, 200.0),
            6,
        );
        let player = Vec2::new(100.0, 200.0);
        let mut fate = ProjectileFate::InFlight;
        for _ in 0..60 {
            fate = arrow.advance(1.0 / 60.0, player, &room());
            if fate != ProjectileFate::InFlight {
                break;
            }
        }
        assert_eq!(fate, ProjectileFate::HitPlayer);
    }

    #[test]
    fn test_projectile_expires_out_of_bounds() {
        let mut arrow = Projectile::aimed(
            new_entity_id(),
            Vec2::new(10.0, 10.0),
            Vec2::new(-10.0, 10.0),
            6,
        );
        let fate = arrow.advance(0.5, Vec2::new(300.0, 300.0), &room());
        assert_eq!(fate, ProjectileFate::Expired);
    }
}
