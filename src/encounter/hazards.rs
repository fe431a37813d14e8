//! Static environmental hazards and the damage-then-breathing-room contact rules.

use crate::utils::{Rect, Vec2};
use crate::{config, Character};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardKind {
    /// Instantaneous: hurts once per contact
    Spikes,
    /// Continuous: ticks while the player stands in it
    FirePit,
    /// Continuous, weaker than fire
    PoisonGas,
}

impl HazardKind {
    /// Damage as a percentage of the victim's max health.
    pub fn damage_percent(self) -> f64 {
        match self {
            HazardKind::Spikes => 10.0,
            HazardKind::FirePit => 6.0,
            HazardKind::PoisonGas => 4.0,
        }
    }

    pub fn is_continuous(self) -> bool {
        !matches!(self, HazardKind::Spikes)
    }

    /// Invulnerability granted after this hazard deals damage.
    pub fn invulnerability_ms(self) -> u64 {
        if self.is_continuous() {
            config::HAZARD_TICK_INVULNERABILITY_MS
        } else {
            config::HAZARD_INVULNERABILITY_MS
        }
    }

    /// Kinds that may appear at `depth`.
    pub fn available_at(depth: u32) -> Vec<HazardKind> {
        let mut kinds = vec![HazardKind::Spikes];
        if depth >= 3 {
            kinds.push(HazardKind::FirePit);
        }
        if depth >= 5 {
            kinds.push(HazardKind::PoisonGas);
        }
        kinds
    }
}

/// A hazard footprint in a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    pub kind: HazardKind,
    pub area: Rect,
    /// Animation phase in `[0, 1)`, advanced every tick for the renderer
    pub phase: f32,
}

impl Hazard {
    pub fn new(kind: HazardKind, area: Rect) -> Self {
        Self {
            kind,
            area,
            phase: 0.0,
        }
    }

    /// Damage this hazard deals to a victim with `max_health`, floored at 1.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{Hazard, HazardKind, Rect};
    ///
    /// let spikes = Hazard::new(HazardKind::Spikes, Rect::new(0.0, 0.0, 10.0, 10.0));
    /// assert_eq!(spikes.damage_for(140), 14);
    /// assert_eq!(spikes.damage_for(3), 1);
    /// ```
    pub fn damage_for(&self, max_health: i32) -> i32 {
        let damage = (max_health as f64 * self.kind.damage_percent() / 100.0).round() as i32;
        damage.max(1)
    }

    pub fn touches(&self, point: Vec2) -> bool {
        self.area.overlaps_circle(point, config::PLAYER_RADIUS)
    }

    /// A few hazards placed away from the entrance at the bottom of the room.
    pub fn scatter(depth: u32, rng: &mut StdRng) -> Vec<Hazard> {
        let kinds = HazardKind::available_at(depth);
        let count = rng.gen_range(1..=2) + usize::from(depth >= 6);
        (0..count)
            .map(|_| {
                let kind = kinds[rng.gen_range(0..kinds.len())];
                let width = rng.gen_range(48.0..96.0);
                let height = rng.gen_range(48.0..96.0);
                let x = rng.gen_range(20.0..config::ROOM_WIDTH - width - 20.0);
                let y = rng.gen_range(60.0..config::ROOM_HEIGHT - height - 140.0);
                Hazard::new(kind, Rect::new(x, y, width, height))
            })
            .collect()
    }
}

/// A hazard plus the player's contact state with it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HazardSlot {
    pub hazard: Hazard,
    in_contact: bool,
    next_tick_ms: u64,
}

impl HazardSlot {
    pub fn new(hazard: Hazard) -> Self {
        Self {
            hazard,
            in_contact: false,
            next_tick_ms: 0,
        }
    }
}

/// Result of one hazard hurting the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HazardHit {
    pub kind: HazardKind,
    pub damage: i32,
}

/// Applies every hazard the player overlaps.
///
/// Instantaneous hazards fire on the first tick of a new contact; continuous ones fire
/// whenever their tick interval has elapsed. Any hit grants a window during which no
/// hazard can hurt the player. Returns the hits dealt and the new invulnerability end.
pub(crate) fn apply_hazards(
    slots: &mut [HazardSlot],
    player: Vec2,
    now_ms: u64,
    dt_secs: f32,
    mut invulnerable_until_ms: u64,
    character: &mut Character,
) -> (Vec<HazardHit>, u64) {
    let mut hits = Vec::new();
    for slot in slots.iter_mut() {
        slot.hazard.phase = (slot.hazard.phase + dt_secs).fract();
        let touching = slot.hazard.touches(player);
        let new_contact = touching && !slot.in_contact;
        slot.in_contact = touching;
        if !touching || now_ms < invulnerable_until_ms || !character.is_alive() {
            continue;
        }

        let kind = slot.hazard.kind;
        let fires = if kind.is_continuous() {
            now_ms >= slot.next_tick_ms
        } else {
            new_contact
        };
        if !fires {
            continue;
        }

        let damage = character.take_true_damage(slot.hazard.damage_for(character.max_health()));
        if kind.is_continuous() {
            slot.next_tick_ms = now_ms + config::HAZARD_TICK_INTERVAL_MS;
        }
        invulnerable_until_ms = now_ms + kind.invulnerability_ms();
        hits.push(HazardHit { kind, damage });
    }
    (hits, invulnerable_until_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CharacterClass;

    fn pit(kind: HazardKind) -> Vec<HazardSlot> {
        vec![HazardSlot::new(Hazard::new(
            kind,
            Rect::new(0.0, 0.0, 50.0, 50.0),
        ))]
    }

    #[test]
    fn test_spikes_hit_once_per_contact() {
        let mut hero = Character::new("Hero", CharacterClass::Warrior);
        let mut slots = pit(HazardKind::Spikes);
        let inside = Vec2::new(25.0, 25.0);

        let (hits, until) = apply_hazards(&mut slots, inside, 0, 0.016, 0, &mut hero);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].damage, 14);
        assert_eq!(until, config::HAZARD_INVULNERABILITY_MS);

        // Standing still long after the window closes does nothing.
        let (hits, _) = apply_hazards(&mut slots, inside, 5_000, 0.016, until, &mut hero);
        assert!(hits.is_empty());

        // Stepping out and back in is a new contact.
        apply_hazards(&mut slots, Vec2::new(200.0, 200.0), 5_100, 0.016, until, &mut hero);
        let (hits, _) = apply_hazards(&mut slots, inside, 5_200, 0.016, until, &mut hero);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_fire_ticks_on_interval() {
        let mut hero = Character::new("Hero", CharacterClass::Warrior);
        let mut slots = pit(HazardKind::FirePit);
        let inside = Vec2::new(10.0, 10.0);
        let mut until = 0;
        let mut total_hits = 0;
        for step in 0..=20 {
            let now = step * 100;
            let (hits, next) = apply_hazards(&mut slots, inside, now, 0.1, until, &mut hero);
            until = next;
            total_hits += hits.len();
        }
        // Ticks at 0, 600, 1200, 1800 within 2000ms.
        assert_eq!(total_hits, 4);
        assert_eq!(hero.health(), 140 - 4 * 8);
    }

    #[test]
    fn test_damage_floor_and_gating() {
        let hazard = Hazard::new(HazardKind::PoisonGas, Rect::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(hazard.damage_for(10), 1);
        assert_eq!(HazardKind::available_at(1), vec![HazardKind::Spikes]);
        assert_eq!(HazardKind::available_at(5).len(), 3);
    }

    #[test]
    fn test_scatter_stays_in_room() {
        use rand::SeedableRng;
        let mut rng = StdRng::seed_from_u64(4);
        for depth in 3..10 {
            for hazard in Hazard::scatter(depth, &mut rng) {
                assert!(hazard.area.origin.x >= 0.0);
                assert!(hazard.area.origin.x + hazard.area.width <= config::ROOM_WIDTH);
                assert!(hazard.area.origin.y + hazard.area.height <= config::ROOM_HEIGHT);
            }
        }
    }
}
