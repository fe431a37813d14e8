//! Status effects carried by enemies during a battle.

use crate::{DebuffSpec, DotSpec, Enemy, Stat, TargetCondition};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusKind {
    Bleed,
    Burn,
    Poison,
    /// Lowers defense by the magnitude
    ArmorBreak,
    /// A named stat penalty from an ability's debuff-on-hit
    Debuff { name: String, stat: Stat },
}

impl StatusKind {
    pub fn is_damage_over_time(&self) -> bool {
        matches!(self, StatusKind::Bleed | StatusKind::Burn | StatusKind::Poison)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusKind,
    pub magnitude: i32,
    pub turns_left: u32,
}

/// An enemy inside a battle, with its active statuses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    pub enemy: Enemy,
    statuses: Vec<StatusEffect>,
}

impl Combatant {
    pub fn new(enemy: Enemy) -> Self {
        Self {
            enemy,
            statuses: Vec::new(),
        }
    }

    pub fn statuses(&self) -> &[StatusEffect] {
        &self.statuses
    }

    pub fn is_alive(&self) -> bool {
        self.enemy.is_alive()
    }

    /// Re-applying a status refreshes its duration and keeps the stronger magnitude.
    pub fn apply_status(&mut self, kind: StatusKind, magnitude: i32, turns: u32) {
        if turns == 0 || magnitude <= 0 {
            return;
        }
        if let Some(existing) = self.statuses.iter_mut().find(|s| s.kind == kind) {
            existing.magnitude = existing.magnitude.max(magnitude);
            existing.turns_left = existing.turns_left.max(turns);
        } else {
            self.statuses.push(StatusEffect {
                kind,
                magnitude,
                turns_left: turns,
            });
        }
    }

    pub fn apply_dot(&mut self, kind: StatusKind, spec: DotSpec) {
        self.apply_status(kind, spec.damage_per_turn, spec.turns);
    }

    pub fn apply_debuff(&mut self, spec: &DebuffSpec) {
        self.apply_status(
            StatusKind::Debuff {
                name: spec.name.clone(),
                stat: spec.stat,
            },
            spec.value.abs(),
            spec.turns,
        );
    }

    fn penalty(&self, stat: Stat) -> i32 {
        self.statuses
            .iter()
            .filter_map(|s| match &s.kind {
                StatusKind::ArmorBreak if stat == Stat::Defense => Some(s.magnitude),
                StatusKind::Debuff { stat: hit, .. } if *hit == stat => Some(s.magnitude),
                _ => None,
            })
            .sum()
    }

    /// Defense removed by armor breaks and defense debuffs.
    pub fn armor_reduction(&self) -> i32 {
        self.penalty(Stat::Defense)
    }

    /// Attack damage after damage debuffs, at least 1.
    pub fn attack_damage(&self) -> i32 {
        (self.enemy.damage - self.penalty(Stat::Damage)).max(1)
    }

    /// Hit chance after hit-chance debuffs.
    pub fn hit_chance(&self) -> f64 {
        (self.enemy.hit_chance - self.penalty(Stat::HitChance) as f64).clamp(5.0, 95.0)
    }

    pub fn is_afflicted(&self) -> bool {
        self.statuses
            .iter()
            .any(|s| s.kind.is_damage_over_time() || s.kind == StatusKind::ArmorBreak)
    }

    pub fn matches(&self, condition: TargetCondition) -> bool {
        match condition {
            TargetCondition::Afflicted => self.is_afflicted(),
            TargetCondition::Unharmed => self.enemy.health == self.enemy.max_health,
        }
    }

    /// Applies damage over time, then counts every status down and drops expired ones.
    ///
    /// Returns the damage dealt.
    pub fn tick_statuses(&mut self) -> i32 {
        let dot: i32 = self
            .statuses
            .iter()
            .filter(|s| s.kind.is_damage_over_time())
            .map(|s| s.magnitude)
            .sum();
        let dealt = if dot > 0 && self.is_alive() {
            self.enemy.take_true_damage(dot)
        } else {
            0
        };
        for status in self.statuses.iter_mut() {
            status.turns_left = status.turns_left.saturating_sub(1);
        }
        let before = self.statuses.len();
        self.statuses.retain(|s| s.turns_left > 0);
        if self.statuses.len() != before {
            debug!("{}: {} statuses expired", self.enemy.name, before - self.statuses.len());
        }
        dealt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EnemyArchetype;

    fn brute() -> Combatant {
        Combatant::new(Enemy::new(EnemyArchetype::Brute, 1))
    }

    #[test]
    fn test_dot_ticks_and_expires() {
        let mut target = brute();
        target.apply_dot(
            StatusKind::Bleed,
            DotSpec {
                damage_per_turn: 3,
                turns: 2,
            },
        );
        assert!(target.is_afflicted());
        assert_eq!(target.tick_statuses(), 3);
        assert_eq!(target.tick_statuses(), 3);
        assert_eq!(target.tick_statuses(), 0);
        assert!(!target.is_afflicted());
        assert_eq!(target.enemy.health, 34);
    }

    #[test]
    fn test_reapply_refreshes_not_stacks() {
        let mut target = brute();
        target.apply_status(StatusKind::Burn, 2, 3);
        target.apply_status(StatusKind::Burn, 4, 1);
        assert_eq!(target.statuses().len(), 1);
        assert_eq!(target.statuses()[0].magnitude, 4);
        assert_eq!(target.statuses()[0].turns_left, 3);
    }

    #[test]
    fn test_armor_break_and_debuffs() {
        let mut target = brute();
        target.apply_status(StatusKind::ArmorBreak, 2, 2);
        target.apply_debuff(&DebuffSpec {
            name: "Weakened".to_string(),
            stat: Stat::Damage,
            value: -3,
            turns: 2,
        });
        assert_eq!(target.armor_reduction(), 2);
        assert_eq!(target.attack_damage(), 4);
        assert!(target.matches(TargetCondition::Afflicted));
        assert!(target.matches(TargetCondition::Unharmed));
    }
}
