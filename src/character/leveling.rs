//! Experience and level-ups.

use super::Character;
use crate::abilities::AbilitySelection;
use crate::config;
use log::info;

impl Character {
    /// Experience required to advance from the current level.
    pub fn experience_threshold(&self) -> u64 {
        self.level_curve.threshold(self.level)
    }

    /// Adds experience and applies every level-up it pays for.
    ///
    /// Overflow carries into the next level, so one large award can grant several
    /// levels. Returns the number of levels gained.
    pub fn gain_experience(&mut self, amount: u64) -> u32 {
        if self.level >= config::MAX_LEVEL {
            return 0;
        }
        self.experience = self.experience.saturating_add(amount);

        let mut gained = 0;
        while self.level < config::MAX_LEVEL && self.experience >= self.experience_threshold() {
            self.experience -= self.experience_threshold();
            self.level_up();
            gained += 1;
        }
        if self.level >= config::MAX_LEVEL {
            self.experience = 0;
        }
        gained
    }

    fn level_up(&mut self) {
        let old_max = self.max_health();
        self.level += 1;
        self.stat_points += config::STAT_POINTS_PER_LEVEL;
        self.passive_points += config::PASSIVE_POINTS_PER_LEVEL;
        if self.level % config::BONUS_PASSIVE_POINTS_EVERY == 0 {
            self.passive_points += config::BONUS_PASSIVE_POINTS;
        }

        let derived = self.recalc_derived_stats();
        if self.health > 0 {
            self.health = (self.health + derived.max_health - old_max).clamp(1, derived.max_health);
        }

        for ability in self.class.abilities_at(self.level) {
            if !self.loadout.iter().any(|s| s.ability_id == ability) {
                info!("{} learned {}", self.name, ability);
                self.loadout.push(AbilitySelection::default_for(ability));
            }
        }
        info!("{} reached level {}", self.name, self.level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CharacterClass, LevelCurve};

    #[test]
    fn test_single_level_up() {
        let mut hero = Character::new("Hero", CharacterClass::Warrior);
        assert_eq!(hero.gain_experience(99), 0);
        assert_eq!(hero.gain_experience(1), 1);
        assert_eq!(hero.level(), 2);
        assert_eq!(hero.experience(), 0);
        assert_eq!(hero.stat_points(), 3);
        assert_eq!(hero.passive_points(), 1);
    }

    #[test]
    fn test_overflow_grants_multiple_levels() {
        let mut hero =
            Character::new("Hero", CharacterClass::Warrior).with_level_curve(LevelCurve::flat(100));
        assert_eq!(hero.gain_experience(350), 3);
        assert_eq!(hero.level(), 4);
        assert_eq!(hero.experience(), 50);
    }

    #[test]
    fn test_bonus_passive_point_every_fifth_level() {
        let mut hero =
            Character::new("Hero", CharacterClass::Rogue).with_level_curve(LevelCurve::flat(10));
        hero.gain_experience(40);
        assert_eq!(hero.level(), 5);
        // four level-ups, plus one bonus at level 5
        assert_eq!(hero.passive_points(), 5);
    }

    #[test]
    fn test_level_up_raises_current_health_by_max_delta() {
        let mut hero = Character::new("Hero", CharacterClass::Warrior);
        hero.take_true_damage(40);
        let before = hero.health();
        hero.gain_experience(100);
        assert_eq!(hero.health(), before + 12);
    }

    #[test]
    fn test_unlocks_new_abilities() {
        let mut hero =
            Character::new("Hero", CharacterClass::Mage).with_level_curve(LevelCurve::flat(1));
        hero.gain_experience(2);
        assert_eq!(hero.level(), 3);
        let ids: Vec<_> = hero.loadout().iter().map(|s| s.ability_id.as_str()).collect();
        assert_eq!(ids, vec!["fireball", "frost_nova"]);
    }

    #[test]
    fn test_level_cap() {
        let mut hero =
            Character::new("Hero", CharacterClass::Warrior).with_level_curve(LevelCurve::flat(1));
        hero.gain_experience(1_000);
        assert_eq!(hero.level(), config::MAX_LEVEL);
        assert_eq!(hero.gain_experience(10), 0);
    }

    #[test]
    fn test_huge_award_saturates() {
        let mut hero = Character::new("Hero", CharacterClass::Warrior);
        hero.gain_experience(50);
        hero.gain_experience(u64::MAX);
        assert_eq!(hero.level(), config::MAX_LEVEL);
        assert_eq!(hero.experience(), 0);
    }

    #[test]
    fn test_level_up_does_not_revive() {
        let mut hero = Character::new("Hero", CharacterClass::Warrior);
        let max = hero.max_health();
        hero.take_true_damage(max);
        assert!(!hero.is_alive());
        hero.gain_experience(100);
        assert_eq!(hero.level(), 2);
        assert_eq!(hero.health(), 0);
    }
}
