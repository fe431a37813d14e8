//! Attribute and stat identifiers shared by items, buffs, talents and run items.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The four base attributes every combatant has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttributeKind {
    Strength,
    Dexterity,
    Intelligence,
    Defense,
}

impl AttributeKind {
    pub fn all() -> [AttributeKind; 4] {
        [
            AttributeKind::Strength,
            AttributeKind::Dexterity,
            AttributeKind::Intelligence,
            AttributeKind::Defense,
        ]
    }

    /// The bonus key that feeds this attribute.
    pub fn stat(self) -> Stat {
        match self {
            AttributeKind::Strength => Stat::Strength,
            AttributeKind::Dexterity => Stat::Dexterity,
            AttributeKind::Intelligence => Stat::Intelligence,
            AttributeKind::Defense => Stat::Defense,
        }
    }
}

/// Everything a bonus can target.
///
/// Chance stats are expressed in whole percentage points; `GoldFind` and
/// `ExperienceGain` are percentage multipliers applied to run rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stat {
    Strength,
    Dexterity,
    Intelligence,
    Defense,
    Damage,
    Health,
    Resource,
    HitChance,
    CritChance,
    DodgeChance,
    GoldFind,
    ExperienceGain,
}

/// Flat integer bonuses keyed by stat.
pub type StatMap = BTreeMap<Stat, i32>;

/// Percentage bonuses keyed by stat (`10.0` = +10%).
pub type PercentMap = BTreeMap<Stat, f64>;

/// Adds every entry of `source` into `target`.
pub fn merge_stats(target: &mut StatMap, source: &StatMap) {
    for (stat, value) in source {
        *target.entry(*stat).or_insert(0) += value;
    }
}

/// Base attribute block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Attributes {
    pub strength: i32,
    pub dexterity: i32,
    pub intelligence: i32,
    pub defense: i32,
}

impl Attributes {
    pub fn new(strength: i32, dexterity: i32, intelligence: i32, defense: i32) -> Self {
        Self {
            strength,
            dexterity,
            intelligence,
            defense,
        }
    }

    pub fn get(&self, kind: AttributeKind) -> i32 {
        match kind {
            AttributeKind::Strength => self.strength,
            AttributeKind::Dexterity => self.dexterity,
            AttributeKind::Intelligence => self.intelligence,
            AttributeKind::Defense => self.defense,
        }
    }

    pub fn set(&mut self, kind: AttributeKind, value: i32) {
        match kind {
            AttributeKind::Strength => self.strength = value,
            AttributeKind::Dexterity => self.dexterity = value,
            AttributeKind::Intelligence => self.intelligence = value,
            AttributeKind::Defense => self.defense = value,
        }
    }

    pub fn add(&mut self, kind: AttributeKind, delta: i32) {
        self.set(kind, self.get(kind) + delta);
    }
}
