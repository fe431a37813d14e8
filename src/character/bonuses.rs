//! Bonus layers that sit on top of base attributes and equipment.
//!
//! - [`TalentTreeBonuses`] are permanent, bought with passive points.
//! - [`RunBonuses`] come from temporary run items and are wiped when a run ends.
//! - [`ConditionalBonus`] entries only count while their [`Condition`] holds, as judged
//!   by the [`ConditionTracker`].

use super::attributes::{PercentMap, Stat, StatMap};
use crate::config;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Gates for conditional bonuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    RecentlyHit,
    RecentlyKilled,
    InBossFight,
    LowHealth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalBonus {
    pub condition: Condition,
    pub stat: Stat,
    pub value: i32,
}

/// Timestamps and flags used to evaluate [`Condition`]s.
///
/// `now_ms` is advanced by the caller; nothing here reads a wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConditionTracker {
    pub now_ms: u64,
    pub last_hit_ms: Option<u64>,
    pub last_kill_ms: Option<u64>,
    pub in_boss_fight: bool,
}

impl ConditionTracker {
    pub fn holds(&self, condition: Condition, health_ratio: f64) -> bool {
        match condition {
            Condition::RecentlyHit => self.within_window(self.last_hit_ms),
            Condition::RecentlyKilled => self.within_window(self.last_kill_ms),
            Condition::InBossFight => self.in_boss_fight,
            Condition::LowHealth => health_ratio < config::LOW_HEALTH_THRESHOLD,
        }
    }

    fn within_window(&self, stamp: Option<u64>) -> bool {
        stamp.is_some_and(|at| self.now_ms.saturating_sub(at) <= config::CONDITION_WINDOW_MS)
    }
}

/// Persistent talent-tree bonuses, grouped by how they apply.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TalentTreeBonuses {
    pub flat: StatMap,
    pub percent: PercentMap,
    pub conditional: Vec<ConditionalBonus>,
}

impl TalentTreeBonuses {
    pub fn flat(&self, stat: Stat) -> i32 {
        self.flat.get(&stat).copied().unwrap_or(0)
    }

    pub fn percent(&self, stat: Stat) -> f64 {
        self.percent.get(&stat).copied().unwrap_or(0.0)
    }
}

/// One node bought with a passive point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PassiveBonus {
    Flat { stat: Stat, value: i32 },
    Percent { stat: Stat, value: f64 },
    Conditional(ConditionalBonus),
}

impl TalentTreeBonuses {
    pub fn apply(&mut self, bonus: PassiveBonus) {
        match bonus {
            PassiveBonus::Flat { stat, value } => {
                *self.flat.entry(stat).or_insert(0) += value;
            }
            PassiveBonus::Percent { stat, value } => {
                *self.percent.entry(stat).or_insert(0.0) += value;
            }
            PassiveBonus::Conditional(bonus) => self.conditional.push(bonus),
        }
    }
}

/// Elemental damage channels carried by run items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Element {
    Fire,
    Frost,
    Poison,
    Lightning,
}

/// Ephemeral bonuses for the current run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunBonuses {
    pub flat: StatMap,
    pub percent: PercentMap,
    /// Extra flat damage per element, added to every hit
    pub elemental: BTreeMap<Element, i32>,
}

impl RunBonuses {
    pub fn flat(&self, stat: Stat) -> i32 {
        self.flat.get(&stat).copied().unwrap_or(0)
    }

    pub fn percent(&self, stat: Stat) -> f64 {
        self.percent.get(&stat).copied().unwrap_or(0.0)
    }

    pub fn elemental_total(&self) -> i32 {
        self.elemental.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.flat.is_empty() && self.percent.is_empty() && self.elemental.is_empty()
    }

    /// Adds `other` on top of these bonuses, scaled by `stacks`.
    pub fn absorb(&mut self, other: &RunBonuses, stacks: u32) {
        let stacks_i = stacks as i32;
        for (stat, value) in &other.flat {
            *self.flat.entry(*stat).or_insert(0) += value * stacks_i;
        }
        for (stat, value) in &other.percent {
            *self.percent.entry(*stat).or_insert(0.0) += value * stacks as f64;
        }
        for (element, value) in &other.elemental {
            *self.elemental.entry(*element).or_insert(0) += value * stacks_i;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recently_hit_window() {
        let mut tracker = ConditionTracker {
            now_ms: 10_000,
            last_hit_ms: Some(7_000),
            ..Default::default()
        };
        assert!(tracker.holds(Condition::RecentlyHit, 1.0));
        tracker.now_ms = 20_000;
        assert!(!tracker.holds(Condition::RecentlyHit, 1.0));
        assert!(!tracker.holds(Condition::RecentlyKilled, 1.0));
    }

    #[test]
    fn test_low_health_condition() {
        let tracker = ConditionTracker::default();
        assert!(tracker.holds(Condition::LowHealth, 0.2));
        assert!(!tracker.holds(Condition::LowHealth, 0.5));
    }

    #[test]
    fn test_run_bonus_absorb_scales_by_stacks() {
        let mut item = RunBonuses::default();
        item.flat.insert(Stat::Damage, 2);
        item.percent.insert(Stat::Defense, 5.0);
        item.elemental.insert(Element::Fire, 3);

        let mut total = RunBonuses::default();
        total.absorb(&item, 3);
        assert_eq!(total.flat(Stat::Damage), 6);
        assert_eq!(total.percent(Stat::Defense), 15.0);
        assert_eq!(total.elemental_total(), 9);
    }

    #[test]
    fn test_passive_bonus_application() {
        let mut tree = TalentTreeBonuses::default();
        tree.apply(PassiveBonus::Flat {
            stat: Stat::Damage,
            value: 3,
        });
        tree.apply(PassiveBonus::Flat {
            stat: Stat::Damage,
            value: 2,
        });
        tree.apply(PassiveBonus::Percent {
            stat: Stat::Health,
            value: 10.0,
        });
        assert_eq!(tree.flat(Stat::Damage), 5);
        assert_eq!(tree.percent(Stat::Health), 10.0);
    }
}
