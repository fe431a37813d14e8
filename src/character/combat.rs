//! Damage in and out of a character, plus the chance formulas.

use super::attributes::Stat;
use super::Character;
use crate::config;
use log::debug;

impl Character {
    /// Defense after every bonus layer, including conditional ones.
    pub fn effective_defense(&self) -> i32 {
        self.derived().defense + self.conditional_bonus(Stat::Defense)
    }

    /// Hit chance in percent, capped at `MAX_HIT_CHANCE`.
    pub fn hit_chance(&self) -> f64 {
        (self.derived().hit_chance + self.conditional_bonus(Stat::HitChance) as f64)
            .clamp(0.0, config::MAX_HIT_CHANCE)
    }

    /// Critical chance in percent, capped at `MAX_CRIT_CHANCE`.
    pub fn crit_chance(&self) -> f64 {
        (self.derived().crit_chance + self.conditional_bonus(Stat::CritChance) as f64)
            .clamp(0.0, config::MAX_CRIT_CHANCE)
    }

    /// Dodge chance in percent, capped at `MAX_DODGE_CHANCE`.
    pub fn dodge_chance(&self) -> f64 {
        (self.derived().dodge_chance + self.conditional_bonus(Stat::DodgeChance) as f64)
            .clamp(0.0, config::MAX_DODGE_CHANCE)
    }

    /// Twice the primary attribute plus flat damage, before percentage multipliers.
    pub fn base_damage(&self) -> i32 {
        self.derived().base_damage + self.conditional_bonus(Stat::Damage)
    }

    /// [`Self::base_damage`] with percentage damage bonuses applied.
    pub fn total_damage(&self) -> i32 {
        let percent = self.derived().damage_percent;
        ((self.base_damage() as f64) * (1.0 + percent / 100.0))
            .round()
            .max(0.0) as i32
    }

    /// Elemental damage from run items, added to every hit.
    pub fn elemental_damage(&self) -> i32 {
        self.run_bonuses.elemental_total()
    }

    /// Reduces incoming damage by defense; the remainder may be zero.
    ///
    /// Returns the damage actually taken.
    pub fn absorb_damage(&mut self, raw: i32) -> i32 {
        let taken = (raw - self.effective_defense()).max(0);
        self.lose_health(taken)
    }

    /// Applies an enemy hit: defense reduction with a floor of 1, rage gain, and the
    /// "recently hit" timestamp.
    pub fn receive_hit(&mut self, raw: i32, now_ms: u64) -> i32 {
        self.advance_clock(now_ms);
        let taken = (raw - self.effective_defense()).max(1);
        let taken = self.lose_health(taken);
        self.conditions.last_hit_ms = Some(self.conditions.now_ms);
        let gain = self.class.resource_on_damage_taken(taken);
        if gain > 0 {
            self.resource.restore(gain);
        }
        debug!("{} took {} (raw {})", self.name, taken, raw);
        taken
    }

    /// Damage that ignores defense (hazards, self-damage).
    pub fn take_true_damage(&mut self, amount: i32) -> i32 {
        self.lose_health(amount.max(0))
    }

    /// Heals up to max health. Returns the amount actually healed.
    pub fn heal(&mut self, amount: i32) -> i32 {
        if amount <= 0 || !self.is_alive() {
            return 0;
        }
        let before = self.health;
        self.health = (self.health + amount).min(self.max_health());
        self.health - before
    }

    /// Rage (or other) gain for landing `damage` on an enemy.
    pub fn on_damage_dealt(&mut self, damage: i32) -> i32 {
        let gain = self.class.resource_on_damage_dealt(damage);
        if gain > 0 {
            self.resource.restore(gain)
        } else {
            0
        }
    }

    /// End-of-turn resource regeneration (or rage decay).
    pub fn turn_regen(&mut self) -> i32 {
        let delta = self.class.turn_regen(&self.resource);
        self.resource.restore(delta)
    }

    fn lose_health(&mut self, amount: i32) -> i32 {
        let before = self.health;
        self.health = (self.health - amount).max(0);
        before - self.health
    }
}
