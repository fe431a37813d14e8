//! Character classes as data.
//!
//! A class is a [`ClassDefinition`] value plus a handful of formula hooks dispatched
//! with `match` on [`CharacterClass`]. There is no per-class type.

use super::attributes::{AttributeKind, Attributes};
use crate::{config, ActionError};
use serde::{Deserialize, Serialize};

/// The single typed resource pool a class spends on abilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Mana,
    Rage,
    Energy,
}

/// Current/max pair for the class resource. `current` stays within `[0, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePool {
    pub kind: ResourceKind,
    current: i32,
    max: i32,
}

impl ResourcePool {
    pub fn new(kind: ResourceKind, max: i32) -> Self {
        let max = max.max(0);
        let current = match kind {
            ResourceKind::Rage => 0,
            ResourceKind::Mana | ResourceKind::Energy => max,
        };
        Self { kind, current, max }
    }

    pub fn current(&self) -> i32 {
        self.current
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn ratio(&self) -> f64 {
        if self.max == 0 {
            0.0
        } else {
            self.current as f64 / self.max as f64
        }
    }

    /// Changes the capacity, clamping the current value into the new range.
    pub fn set_max(&mut self, max: i32) {
        self.max = max.max(0);
        self.current = self.current.clamp(0, self.max);
    }

    /// Deducts `amount` if affordable. Costs are rounded up.
    pub fn spend(&mut self, amount: f64) -> Result<(), ActionError> {
        let cost = amount.max(0.0).ceil() as i32;
        if cost > self.current {
            return Err(ActionError::InsufficientResource {
                needed: amount,
                available: self.current,
            });
        }
        self.current -= cost;
        Ok(())
    }

    /// Adds (or with a negative amount, drains) resource. Returns the actual change.
    pub fn restore(&mut self, amount: i32) -> i32 {
        let before = self.current;
        self.current = (self.current + amount).clamp(0, self.max);
        self.current - before
    }

    pub fn fill(&mut self) {
        self.current = self.max;
    }
}

/// Exponential experience curve: `threshold(level) = base_xp * multiplier^(level-1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelCurve {
    pub base_xp: u64,
    pub multiplier: f64,
}

impl LevelCurve {
    /// A curve where every level costs the same.
    pub fn flat(base_xp: u64) -> Self {
        Self {
            base_xp,
            multiplier: 1.0,
        }
    }

    /// Experience needed to advance from `level` to `level + 1`.
    pub fn threshold(&self, level: u32) -> u64 {
        let exponent = level.saturating_sub(1) as i32;
        let value = self.base_xp as f64 * self.multiplier.powi(exponent);
        (value.round() as u64).max(1)
    }
}

impl Default for LevelCurve {
    fn default() -> Self {
        Self {
            base_xp: config::BASE_XP,
            multiplier: config::XP_MULTIPLIER,
        }
    }
}

/// Playable classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterClass {
    Warrior,
    Rogue,
    Mage,
}

/// Static data describing a class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDefinition {
    pub class: CharacterClass,
    pub resource: ResourceKind,
    pub base_attributes: Attributes,
    pub base_health: i32,
    pub health_per_level: i32,
    /// Attribute that drives weapon damage
    pub primary: AttributeKind,
    /// Ability ids paired with the level at which they unlock
    pub abilities: &'static [(&'static str, u32)],
    pub level_curve: LevelCurve,
}

impl CharacterClass {
    pub fn all() -> [CharacterClass; 3] {
        [
            CharacterClass::Warrior,
            CharacterClass::Rogue,
            CharacterClass::Mage,
        ]
    }

    pub fn definition(self) -> ClassDefinition {
        match self {
            CharacterClass::Warrior => ClassDefinition {
                class: self,
                resource: ResourceKind::Rage,
                base_attributes: Attributes::new(10, 5, 2, 5),
                base_health: 120,
                health_per_level: 12,
                primary: AttributeKind::Strength,
                abilities: &[("cleave", 1), ("shield_bash", 3), ("whirlwind", 6)],
                level_curve: LevelCurve::default(),
            },
            CharacterClass::Rogue => ClassDefinition {
                class: self,
                resource: ResourceKind::Energy,
                base_attributes: Attributes::new(5, 10, 3, 3),
                base_health: 95,
                health_per_level: 9,
                primary: AttributeKind::Dexterity,
                abilities: &[("backstab", 1), ("poison_blade", 3), ("shadow_flurry", 6)],
                level_curve: LevelCurve::default(),
            },
            CharacterClass::Mage => ClassDefinition {
                class: self,
                resource: ResourceKind::Mana,
                base_attributes: Attributes::new(3, 4, 10, 2),
                base_health: 80,
                health_per_level: 7,
                primary: AttributeKind::Intelligence,
                abilities: &[("fireball", 1), ("frost_nova", 3), ("arcane_barrage", 6)],
                level_curve: LevelCurve::default(),
            },
        }
    }

    /// Resource capacity before flat/percent `Resource` bonuses.
    pub fn base_resource_max(self, intelligence: i32) -> i32 {
        match self.definition().resource {
            ResourceKind::Mana => 50 + intelligence.max(0) * 5,
            ResourceKind::Rage | ResourceKind::Energy => 100,
        }
    }

    /// Resource change applied at the end of every battle turn.
    pub fn turn_regen(self, pool: &ResourcePool) -> i32 {
        match pool.kind {
            ResourceKind::Mana => (pool.max() / 10).max(1),
            ResourceKind::Energy => 25,
            ResourceKind::Rage => -5,
        }
    }

    /// Resource gained when hit for `damage`.
    pub fn resource_on_damage_taken(self, damage: i32) -> i32 {
        match self.definition().resource {
            ResourceKind::Rage if damage > 0 => (damage / 2).max(1),
            _ => 0,
        }
    }

    /// Resource gained when dealing `damage`.
    pub fn resource_on_damage_dealt(self, damage: i32) -> i32 {
        match self.definition().resource {
            ResourceKind::Rage if damage > 0 => 5 + damage / 10,
            _ => 0,
        }
    }

    /// Abilities available at `level`, in unlock order.
    pub fn abilities_at(self, level: u32) -> Vec<&'static str> {
        self.definition()
            .abilities
            .iter()
            .filter(|(_, unlock)| *unlock <= level)
            .map(|(id, _)| *id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_curve_is_exponential() {
        let curve = LevelCurve::default();
        assert_eq!(curve.threshold(1), 100);
        assert_eq!(curve.threshold(2), 150);
        assert_eq!(curve.threshold(3), 225);
    }

    #[test]
    fn test_resource_pool_spend_and_restore() {
        let mut pool = ResourcePool::new(ResourceKind::Mana, 50);
        assert_eq!(pool.current(), 50);
        pool.spend(20.0).unwrap();
        assert_eq!(pool.current(), 30);
        assert!(pool.spend(31.0).is_err());
        assert_eq!(pool.current(), 30);
        assert_eq!(pool.restore(100), 20);
        assert_eq!(pool.restore(-100), -50);
        assert_eq!(pool.current(), 0);
    }

    #[test]
    fn test_rage_starts_empty() {
        let pool = ResourcePool::new(ResourceKind::Rage, 100);
        assert_eq!(pool.current(), 0);
    }

    #[test]
    fn test_class_hooks() {
        assert_eq!(CharacterClass::Warrior.resource_on_damage_taken(10), 5);
        assert_eq!(CharacterClass::Mage.resource_on_damage_taken(10), 0);
        assert_eq!(CharacterClass::Mage.base_resource_max(10), 100);
        assert_eq!(CharacterClass::Warrior.abilities_at(1), vec!["cleave"]);
        assert_eq!(CharacterClass::Rogue.abilities_at(6).len(), 3);
    }
}
