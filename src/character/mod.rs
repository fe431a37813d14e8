//! # Character Module
//!
//! The combatant stat model: base attributes, equipment, buffs, the class resource pool,
//! and the permanent and ephemeral bonus layers that feed derived combat numbers.
//!
//! Derived values (max health, defense, chances, damage) are cached in a
//! [`DerivedStats`] block. Every mutator that can change them calls
//! [`Character::recalc_derived_stats`], so callers never touch the cache directly.
//! Getters hand out shared borrows only; mutation goes through the methods here.

pub mod attributes;
pub mod bonuses;
pub mod buffs;
pub mod class;
pub mod combat;
pub mod equipment;
pub mod leveling;

pub use attributes::*;
pub use bonuses::*;
pub use buffs::*;
pub use class::*;
pub use equipment::*;

use crate::abilities::AbilitySelection;
use crate::{config, ActionError};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Consumables carried between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PotionKind {
    Health,
    Resource,
}

/// Cached derived values. Conditional bonuses are added at query time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivedStats {
    pub max_health: i32,
    pub max_resource: i32,
    pub defense: i32,
    pub base_damage: i32,
    pub damage_percent: f64,
    pub hit_chance: f64,
    pub crit_chance: f64,
    pub dodge_chance: f64,
}

/// Read-only view for the HUD.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HudSnapshot {
    pub name: String,
    pub level: u32,
    pub health: i32,
    pub max_health: i32,
    pub health_ratio: f64,
    pub resource_kind: ResourceKind,
    pub resource: i32,
    pub max_resource: i32,
    pub resource_ratio: f64,
    pub gold: u64,
    pub experience_ratio: f64,
}

/// The player character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub class: CharacterClass,
    level: u32,
    experience: u64,
    level_curve: LevelCurve,
    health: i32,
    base_attributes: Attributes,
    resource: ResourcePool,
    gold: u64,
    scrap: u64,
    jewels: u64,
    stat_points: u32,
    passive_points: u32,
    equipment: BTreeMap<EquipmentSlot, Item>,
    inventory: Vec<Item>,
    buffs: BTreeMap<String, BuffStack>,
    talent_bonuses: TalentTreeBonuses,
    run_bonuses: RunBonuses,
    conditions: ConditionTracker,
    potions: BTreeMap<PotionKind, u32>,
    loadout: Vec<AbilitySelection>,
    #[serde(skip)]
    derived: Option<DerivedStats>,
}

impl Character {
    /// Creates a level-1 character with the class's starting attributes.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{Character, CharacterClass};
    ///
    /// let hero = Character::new("Hero", CharacterClass::Warrior);
    /// assert_eq!(hero.level(), 1);
    /// assert_eq!(hero.health(), hero.max_health());
    /// ```
    pub fn new(name: impl Into<String>, class: CharacterClass) -> Self {
        let definition = class.definition();
        let mut potions = BTreeMap::new();
        potions.insert(PotionKind::Health, 2);

        let mut character = Self {
            name: name.into(),
            class,
            level: 1,
            experience: 0,
            level_curve: definition.level_curve,
            health: 0,
            base_attributes: definition.base_attributes,
            resource: ResourcePool::new(
                definition.resource,
                class.base_resource_max(definition.base_attributes.intelligence),
            ),
            gold: 0,
            scrap: 0,
            jewels: 0,
            stat_points: 0,
            passive_points: 0,
            equipment: BTreeMap::new(),
            inventory: Vec::new(),
            buffs: BTreeMap::new(),
            talent_bonuses: TalentTreeBonuses::default(),
            run_bonuses: RunBonuses::default(),
            conditions: ConditionTracker::default(),
            potions,
            loadout: class
                .abilities_at(1)
                .into_iter()
                .map(AbilitySelection::default_for)
                .collect(),
            derived: None,
        };
        let derived = character.recalc_derived_stats();
        character.health = derived.max_health;
        if character.resource.kind != ResourceKind::Rage {
            character.resource.fill();
        }
        character
    }

    /// Replaces the experience curve (builder style).
    pub fn with_level_curve(mut self, curve: LevelCurve) -> Self {
        self.level_curve = curve;
        self
    }

    // ------------------------------------------------------------------
    // Derived stats
    // ------------------------------------------------------------------

    /// Recomputes and caches every derived value, clamping health and resource.
    pub fn recalc_derived_stats(&mut self) -> DerivedStats {
        let derived = self.compute_derived();
        self.derived = Some(derived);
        self.resource.set_max(derived.max_resource);
        self.health = self.health.clamp(0, derived.max_health);
        derived
    }

    /// Cached derived values, computed on the fly if the cache is cold (fresh from a save).
    pub fn derived(&self) -> DerivedStats {
        self.derived.unwrap_or_else(|| self.compute_derived())
    }

    fn compute_derived(&self) -> DerivedStats {
        let definition = self.class.definition();
        let strength = self.effective_attribute(AttributeKind::Strength);
        let dexterity = self.effective_attribute(AttributeKind::Dexterity);
        let intelligence = self.effective_attribute(AttributeKind::Intelligence);

        let raw_health = definition.base_health
            + (self.level as i32 - 1) * definition.health_per_level
            + config::HEALTH_PER_STRENGTH * strength
            + self.flat_bonus(Stat::Health);
        let max_health = apply_percent(raw_health, self.percent_bonus(Stat::Health)).max(1);

        let raw_resource =
            self.class.base_resource_max(intelligence) + self.flat_bonus(Stat::Resource);
        let max_resource = apply_percent(raw_resource, self.percent_bonus(Stat::Resource)).max(0);

        // Defense: (base + equipment + buffs + talents) scaled by percent, then run flat
        let defense_core = self.total_attribute(AttributeKind::Defense)
            + self.buff_bonus(Stat::Defense)
            + self.talent_bonuses.flat(Stat::Defense);
        let defense = apply_percent(defense_core, self.percent_bonus(Stat::Defense))
            + self.run_bonuses.flat(Stat::Defense);

        let base_damage = 2 * self.effective_attribute(definition.primary)
            + self.flat_bonus(Stat::Damage);

        DerivedStats {
            max_health,
            max_resource,
            defense,
            base_damage,
            damage_percent: self.percent_bonus(Stat::Damage),
            hit_chance: config::BASE_HIT_CHANCE
                + dexterity as f64 * config::HIT_PER_DEXTERITY
                + self.flat_bonus(Stat::HitChance) as f64,
            crit_chance: config::BASE_CRIT_CHANCE
                + dexterity as f64 * config::CRIT_PER_DEXTERITY
                + self.flat_bonus(Stat::CritChance) as f64,
            dodge_chance: config::BASE_DODGE_CHANCE
                + dexterity as f64 * config::DODGE_PER_DEXTERITY
                + self.flat_bonus(Stat::DodgeChance) as f64,
        }
    }

    /// Base attribute plus equipment bonuses for that attribute.
    pub fn total_attribute(&self, kind: AttributeKind) -> i32 {
        self.base_attributes.get(kind) + self.equipment_bonus(kind.stat())
    }

    /// [`Self::total_attribute`] plus buffs, talent-tree and run-item flat bonuses.
    pub fn effective_attribute(&self, kind: AttributeKind) -> i32 {
        let stat = kind.stat();
        self.total_attribute(kind)
            + self.buff_bonus(stat)
            + self.talent_bonuses.flat(stat)
            + self.run_bonuses.flat(stat)
    }

    /// Flat bonus to a non-attribute stat from every unconditional source.
    pub fn flat_bonus(&self, stat: Stat) -> i32 {
        self.equipment_bonus(stat)
            + self.buff_bonus(stat)
            + self.talent_bonuses.flat(stat)
            + self.run_bonuses.flat(stat)
    }

    /// Percentage bonus to a stat from talents and run items.
    pub fn percent_bonus(&self, stat: Stat) -> f64 {
        self.talent_bonuses.percent(stat) + self.run_bonuses.percent(stat)
    }

    /// Sum of conditional talent bonuses whose condition currently holds.
    pub fn conditional_bonus(&self, stat: Stat) -> i32 {
        let ratio = self.health_ratio();
        self.talent_bonuses
            .conditional
            .iter()
            .filter(|b| b.stat == stat && self.conditions.holds(b.condition, ratio))
            .map(|b| b.value)
            .sum()
    }

    // ------------------------------------------------------------------
    // Plain accessors
    // ------------------------------------------------------------------

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn experience(&self) -> u64 {
        self.experience
    }

    pub fn level_curve(&self) -> LevelCurve {
        self.level_curve
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    pub fn max_health(&self) -> i32 {
        self.derived().max_health
    }

    pub fn health_ratio(&self) -> f64 {
        let max = self.max_health();
        if max <= 0 {
            0.0
        } else {
            self.health as f64 / max as f64
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn base_attributes(&self) -> Attributes {
        self.base_attributes
    }

    pub fn resource(&self) -> &ResourcePool {
        &self.resource
    }

    pub fn gold(&self) -> u64 {
        self.gold
    }

    pub fn scrap(&self) -> u64 {
        self.scrap
    }

    pub fn jewels(&self) -> u64 {
        self.jewels
    }

    pub fn stat_points(&self) -> u32 {
        self.stat_points
    }

    pub fn passive_points(&self) -> u32 {
        self.passive_points
    }

    pub fn talent_bonuses(&self) -> &TalentTreeBonuses {
        &self.talent_bonuses
    }

    pub fn run_bonuses(&self) -> &RunBonuses {
        &self.run_bonuses
    }

    pub fn conditions(&self) -> &ConditionTracker {
        &self.conditions
    }

    pub fn loadout(&self) -> &[AbilitySelection] {
        &self.loadout
    }

    // ------------------------------------------------------------------
    // Mutators used by town screens, runs and battles
    // ------------------------------------------------------------------

    /// Moves one unallocated stat point into a base attribute.
    pub fn allocate_stat_point(&mut self, kind: AttributeKind) -> Result<(), ActionError> {
        if self.stat_points == 0 {
            return Err(ActionError::NoStatPoints);
        }
        self.stat_points -= 1;
        self.base_attributes.add(kind, 1);
        self.recalc_derived_stats();
        Ok(())
    }

    /// Spends a passive point on a talent-tree bonus.
    pub fn spend_passive_point(&mut self, bonus: PassiveBonus) -> Result<(), ActionError> {
        if self.passive_points == 0 {
            return Err(ActionError::NoPassivePoints);
        }
        self.passive_points -= 1;
        self.talent_bonuses.apply(bonus);
        self.recalc_derived_stats();
        Ok(())
    }

    /// Replaces the ephemeral run-item bonuses.
    pub fn set_run_bonuses(&mut self, bonuses: RunBonuses) {
        self.run_bonuses = bonuses;
        self.recalc_derived_stats();
    }

    /// Clears run-item bonuses, as happens between runs.
    pub fn reset_run_bonuses(&mut self) {
        if !self.run_bonuses.is_empty() {
            info!("{}: run bonuses reset", self.name);
        }
        self.set_run_bonuses(RunBonuses::default());
    }

    pub fn add_gold(&mut self, amount: u64) {
        self.gold += amount;
    }

    pub fn spend_gold(&mut self, amount: u64) -> Result<(), ActionError> {
        if self.gold < amount {
            return Err(ActionError::InsufficientGold {
                needed: amount,
                available: self.gold,
            });
        }
        self.gold -= amount;
        Ok(())
    }

    pub fn add_scrap(&mut self, amount: u64) {
        self.scrap += amount;
    }

    pub fn spend_scrap(&mut self, amount: u64) -> Result<(), ActionError> {
        if self.scrap < amount {
            return Err(ActionError::InsufficientScrap {
                needed: amount,
                available: self.scrap,
            });
        }
        self.scrap -= amount;
        Ok(())
    }

    pub fn add_jewels(&mut self, amount: u64) {
        self.jewels += amount;
    }

    pub fn add_potions(&mut self, kind: PotionKind, count: u32) {
        *self.potions.entry(kind).or_insert(0) += count;
    }

    pub fn potion_count(&self, kind: PotionKind) -> u32 {
        self.potions.get(&kind).copied().unwrap_or(0)
    }

    /// Drinks a potion. Health potions restore 35% max health, resource potions 40% max resource.
    ///
    /// Returns the amount restored.
    pub fn use_potion(&mut self, kind: PotionKind) -> Result<i32, ActionError> {
        let count = self.potions.get_mut(&kind).ok_or(ActionError::EmptySlot)?;
        if *count == 0 {
            return Err(ActionError::EmptySlot);
        }
        *count -= 1;
        let restored = match kind {
            PotionKind::Health => {
                let amount = (self.max_health() as f64 * 0.35).round() as i32;
                self.heal(amount)
            }
            PotionKind::Resource => {
                let amount = (self.resource.max() as f64 * 0.40).round() as i32;
                self.resource.restore(amount)
            }
        };
        Ok(restored)
    }

    /// Adds (or drains) class resource; returns the actual change.
    pub fn restore_resource(&mut self, amount: i32) -> i32 {
        self.resource.restore(amount)
    }

    /// Deducts an ability cost from the resource pool.
    pub fn spend_resource(&mut self, amount: f64) -> Result<(), ActionError> {
        self.resource.spend(amount)
    }

    /// Full heal and, for pooled classes, a full resource bar. Used on returning to town.
    pub fn restore_full(&mut self) {
        self.recalc_derived_stats();
        self.health = self.max_health();
        if self.resource.kind == ResourceKind::Rage {
            self.resource.restore(-self.resource.max());
        } else {
            self.resource.fill();
        }
        self.conditions.in_boss_fight = false;
    }

    /// Advances the clock used by conditional bonuses.
    pub fn advance_clock(&mut self, now_ms: u64) {
        self.conditions.now_ms = self.conditions.now_ms.max(now_ms);
    }

    pub fn record_kill(&mut self) {
        self.conditions.last_kill_ms = Some(self.conditions.now_ms);
    }

    pub fn set_in_boss_fight(&mut self, in_boss_fight: bool) {
        self.conditions.in_boss_fight = in_boss_fight;
    }

    pub fn set_loadout(&mut self, loadout: Vec<AbilitySelection>) {
        self.loadout = loadout;
    }

    /// Read-only numbers the HUD draws.
    pub fn hud_snapshot(&self) -> HudSnapshot {
        let threshold = self.experience_threshold();
        HudSnapshot {
            name: self.name.clone(),
            level: self.level,
            health: self.health,
            max_health: self.max_health(),
            health_ratio: self.health_ratio(),
            resource_kind: self.resource.kind,
            resource: self.resource.current(),
            max_resource: self.resource.max(),
            resource_ratio: self.resource.ratio(),
            gold: self.gold,
            experience_ratio: self.experience as f64 / threshold as f64,
        }
    }
}

/// `value * (1 + percent/100)`, rounded.
fn apply_percent(value: i32, percent: f64) -> i32 {
    (value as f64 * (1.0 + percent / 100.0)).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_character_defaults() {
        let hero = Character::new("Hero", CharacterClass::Warrior);
        assert_eq!(hero.level(), 1);
        assert_eq!(hero.total_attribute(AttributeKind::Strength), 10);
        // 120 base + 2 per strength
        assert_eq!(hero.max_health(), 140);
        assert_eq!(hero.health(), 140);
        assert_eq!(hero.resource().kind, ResourceKind::Rage);
        assert_eq!(hero.resource().current(), 0);
        assert_eq!(hero.loadout().len(), 1);
    }

    #[test]
    fn test_mage_starts_with_full_mana() {
        let mage = Character::new("Merlin", CharacterClass::Mage);
        assert_eq!(mage.resource().kind, ResourceKind::Mana);
        assert_eq!(mage.resource().current(), 100);
    }

    #[test]
    fn test_recalc_is_idempotent() {
        let mut hero = Character::new("Hero", CharacterClass::Rogue);
        hero.add_to_inventory(Item::new("Boots", ItemKind::Boots).with_bonus(Stat::DodgeChance, 4));
        hero.equip_from_inventory(0).unwrap();
        let first = hero.recalc_derived_stats();
        let second = hero.recalc_derived_stats();
        assert_eq!(first, second);
    }

    #[test]
    fn test_stat_point_allocation() {
        let mut hero = Character::new("Hero", CharacterClass::Warrior);
        assert_eq!(
            hero.allocate_stat_point(AttributeKind::Strength),
            Err(ActionError::NoStatPoints)
        );
        hero.gain_experience(100);
        let before = hero.max_health();
        hero.allocate_stat_point(AttributeKind::Strength).unwrap();
        assert_eq!(hero.base_attributes().strength, 11);
        assert_eq!(hero.max_health(), before + config::HEALTH_PER_STRENGTH);
    }

    #[test]
    fn test_gold_spending_is_all_or_nothing() {
        let mut hero = Character::new("Hero", CharacterClass::Warrior);
        hero.add_gold(50);
        assert_eq!(
            hero.spend_gold(60),
            Err(ActionError::InsufficientGold {
                needed: 60,
                available: 50
            })
        );
        assert_eq!(hero.gold(), 50);
        hero.spend_gold(50).unwrap();
        assert_eq!(hero.gold(), 0);
    }

    #[test]
    fn test_health_potion() {
        let mut hero = Character::new("Hero", CharacterClass::Warrior);
        hero.take_true_damage(100);
        let restored = hero.use_potion(PotionKind::Health).unwrap();
        assert_eq!(restored, 49);
        assert_eq!(hero.potion_count(PotionKind::Health), 1);
        assert_eq!(hero.use_potion(PotionKind::Resource), Err(ActionError::EmptySlot));
    }

    #[test]
    fn test_run_bonuses_feed_derived_stats_and_reset() {
        let mut hero = Character::new("Hero", CharacterClass::Warrior);
        let mut bonuses = RunBonuses::default();
        bonuses.percent.insert(Stat::Health, 50.0);
        hero.set_run_bonuses(bonuses);
        assert_eq!(hero.max_health(), 210);
        hero.reset_run_bonuses();
        assert_eq!(hero.max_health(), 140);
        assert!(hero.health() <= hero.max_health());
    }

    #[test]
    fn test_conditional_bonus_applies_only_when_true() {
        let mut hero = Character::new("Hero", CharacterClass::Warrior);
        hero.passive_points = 1;
        hero.spend_passive_point(PassiveBonus::Conditional(ConditionalBonus {
            condition: Condition::InBossFight,
            stat: Stat::Damage,
            value: 10,
        }))
        .unwrap();

        let base = hero.base_damage();
        hero.set_in_boss_fight(true);
        assert_eq!(hero.base_damage(), base + 10);
        hero.set_in_boss_fight(false);
        assert_eq!(hero.base_damage(), base);
    }

    #[test]
    fn test_hud_snapshot_ratios() {
        let mut hero = Character::new("Hero", CharacterClass::Warrior);
        hero.take_true_damage(70);
        let hud = hero.hud_snapshot();
        assert_eq!(hud.health, 70);
        assert!((hud.health_ratio - 0.5).abs() < 1e-9);
    }
}
