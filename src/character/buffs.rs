//! Timed buffs and debuffs.

use super::attributes::{Stat, StatMap};
use super::Character;
use crate::config;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An active buff. Re-applying the same name extends it instead of replacing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuffStack {
    pub name: String,
    /// Stat changes while active; negative values make it a debuff
    pub modifiers: StatMap,
    pub remaining_turns: u32,
    /// Number of applications folded into this stack, capped at `MAX_BUFF_STACKS`
    pub stacks: u32,
}

impl BuffStack {
    pub fn new(name: impl Into<String>, modifiers: StatMap, duration: u32) -> Self {
        Self {
            name: name.into(),
            modifiers,
            remaining_turns: duration,
            stacks: 1,
        }
    }

    pub fn is_debuff(&self) -> bool {
        !self.modifiers.is_empty() && self.modifiers.values().all(|v| *v < 0)
    }

    pub fn modifier(&self, stat: Stat) -> i32 {
        self.modifiers.get(&stat).copied().unwrap_or(0)
    }

    /// Folds another application into this stack.
    fn extend(&mut self, duration: u32) {
        if self.stacks < config::MAX_BUFF_STACKS {
            self.stacks += 1;
            self.remaining_turns += duration;
        } else {
            self.remaining_turns = self.remaining_turns.max(duration);
        }
    }
}

impl Character {
    /// Applies a named buff, or extends it if already active. Returns its stack count.
    pub fn apply_buff(&mut self, name: &str, modifiers: StatMap, duration: u32) -> u32 {
        if duration == 0 {
            debug!("Ignoring zero-duration buff {}", name);
            return self.buffs.get(name).map(|b| b.stacks).unwrap_or(0);
        }

        let stacks = match self.buffs.get_mut(name) {
            Some(existing) => {
                existing.extend(duration);
                debug!(
                    "Extended buff {} to {} turns ({} stacks)",
                    name, existing.remaining_turns, existing.stacks
                );
                existing.stacks
            }
            None => {
                self.buffs
                    .insert(name.to_string(), BuffStack::new(name, modifiers, duration));
                debug!("Applied buff {} for {} turns", name, duration);
                1
            }
        };
        self.recalc_derived_stats();
        stacks
    }

    /// Advances every buff by one turn and drops the expired ones.
    ///
    /// Returns the names of buffs that expired this turn.
    pub fn tick_buffs(&mut self) -> Vec<String> {
        let mut expired = Vec::new();
        self.buffs.retain(|name, buff| {
            buff.remaining_turns = buff.remaining_turns.saturating_sub(1);
            if buff.remaining_turns == 0 {
                expired.push(name.clone());
                false
            } else {
                true
            }
        });

        if !expired.is_empty() {
            for name in &expired {
                info!("{}: {} wore off", self.name, name);
            }
            self.recalc_derived_stats();
        }
        expired
    }

    pub fn remove_buff(&mut self, name: &str) -> bool {
        let removed = self.buffs.remove(name).is_some();
        if removed {
            self.recalc_derived_stats();
        }
        removed
    }

    pub fn buffs(&self) -> &BTreeMap<String, BuffStack> {
        &self.buffs
    }

    pub fn has_buff(&self, name: &str) -> bool {
        self.buffs.contains_key(name)
    }

    /// Sum of a stat across every active buff.
    pub(crate) fn buff_bonus(&self, stat: Stat) -> i32 {
        self.buffs.values().map(|b| b.modifier(stat)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CharacterClass;

    fn might() -> StatMap {
        let mut m = StatMap::new();
        m.insert(Stat::Strength, 4);
        m
    }

    #[test]
    fn test_buff_extends_instead_of_replacing() {
        let mut hero = Character::new("Hero", CharacterClass::Warrior);
        assert_eq!(hero.apply_buff("Might", might(), 3), 1);
        assert_eq!(hero.apply_buff("Might", might(), 3), 2);
        let buff = &hero.buffs()["Might"];
        assert_eq!(buff.remaining_turns, 6);
        assert_eq!(buff.stacks, 2);
        // Modifiers count once regardless of stacks
        assert_eq!(hero.buff_bonus(Stat::Strength), 4);
    }

    #[test]
    fn test_buff_stacks_are_capped() {
        let mut hero = Character::new("Hero", CharacterClass::Warrior);
        for _ in 0..10 {
            hero.apply_buff("Might", might(), 2);
        }
        let buff = &hero.buffs()["Might"];
        assert_eq!(buff.stacks, config::MAX_BUFF_STACKS);
        assert_eq!(buff.remaining_turns, 2 * config::MAX_BUFF_STACKS);
    }

    #[test]
    fn test_buff_expiry_once_per_turn() {
        let mut hero = Character::new("Hero", CharacterClass::Warrior);
        let base_damage = hero.base_damage();
        hero.apply_buff("Might", might(), 2);
        assert_eq!(hero.base_damage(), base_damage + 8);

        assert!(hero.tick_buffs().is_empty());
        assert!(hero.has_buff("Might"));
        assert_eq!(hero.tick_buffs(), vec!["Might".to_string()]);
        assert!(!hero.has_buff("Might"));
        assert_eq!(hero.base_damage(), base_damage);
    }

    #[test]
    fn test_debuff_detection() {
        let mut weak = StatMap::new();
        weak.insert(Stat::Defense, -3);
        assert!(BuffStack::new("Sunder", weak, 2).is_debuff());
        assert!(!BuffStack::new("Might", might(), 2).is_debuff());
    }
}
