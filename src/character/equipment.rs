//! Items, equipment slots and the slot rules for equipping.

use super::attributes::{Stat, StatMap};
use super::Character;
use crate::{config, new_entity_id, ActionError, EntityId};
use log::info;
use serde::{Deserialize, Serialize};

/// Where an equipped item lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EquipmentSlot {
    Head,
    Chest,
    Legs,
    Hands,
    Feet,
    MainHand,
    OffHand,
    Ring1,
    Ring2,
    Amulet,
}

/// What kind of item this is, which decides the slot rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    OneHandedWeapon,
    TwoHandedWeapon,
    Shield,
    OffHand,
    Helmet,
    ChestArmor,
    Leggings,
    Gloves,
    Boots,
    Ring,
    Amulet,
}

impl ItemKind {
    /// Fixed slot for kinds that have exactly one.
    fn fixed_slot(self) -> Option<EquipmentSlot> {
        match self {
            ItemKind::OneHandedWeapon | ItemKind::TwoHandedWeapon => Some(EquipmentSlot::MainHand),
            ItemKind::Shield | ItemKind::OffHand => Some(EquipmentSlot::OffHand),
            ItemKind::Helmet => Some(EquipmentSlot::Head),
            ItemKind::ChestArmor => Some(EquipmentSlot::Chest),
            ItemKind::Leggings => Some(EquipmentSlot::Legs),
            ItemKind::Gloves => Some(EquipmentSlot::Hands),
            ItemKind::Boots => Some(EquipmentSlot::Feet),
            ItemKind::Amulet => Some(EquipmentSlot::Amulet),
            ItemKind::Ring => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

/// An equippable item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: EntityId,
    pub name: String,
    pub kind: ItemKind,
    pub rarity: Rarity,
    pub bonuses: StatMap,
    pub required_level: u32,
    /// Sell value in gold
    pub value: u64,
    /// Number of enchantments applied so far
    pub enchants: usize,
}

impl Item {
    pub fn new(name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: new_entity_id(),
            name: name.into(),
            kind,
            rarity: Rarity::Common,
            bonuses: StatMap::new(),
            required_level: 1,
            value: 10,
            enchants: 0,
        }
    }

    /// Builder-style bonus setter.
    pub fn with_bonus(mut self, stat: Stat, value: i32) -> Self {
        *self.bonuses.entry(stat).or_insert(0) += value;
        self
    }

    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = rarity;
        self
    }

    pub fn with_required_level(mut self, level: u32) -> Self {
        self.required_level = level;
        self
    }

    pub fn with_value(mut self, value: u64) -> Self {
        self.value = value;
        self
    }

    pub fn bonus(&self, stat: Stat) -> i32 {
        self.bonuses.get(&stat).copied().unwrap_or(0)
    }

    pub fn is_two_handed(&self) -> bool {
        self.kind == ItemKind::TwoHandedWeapon
    }
}

impl Character {
    /// Equips the inventory item at `index`, returning displaced items to the inventory.
    ///
    /// Slot rules:
    /// - a one-handed weapon takes the main hand, displacing whatever is there
    /// - a two-handed weapon clears both hands
    /// - a shield or off-hand item is refused while a two-handed weapon is held
    /// - a ring fills the first free ring slot, otherwise replaces ring slot 1
    pub fn equip_from_inventory(&mut self, index: usize) -> Result<EquipmentSlot, ActionError> {
        let candidate = self.inventory.get(index).ok_or(ActionError::NotInInventory)?;

        if candidate.required_level > self.level {
            return Err(ActionError::LevelTooLow {
                required: candidate.required_level,
            });
        }

        let holding_two_hander = self
            .equipment
            .get(&EquipmentSlot::MainHand)
            .is_some_and(Item::is_two_handed);
        if matches!(candidate.kind, ItemKind::Shield | ItemKind::OffHand) && holding_two_hander {
            return Err(ActionError::SlotBlocked(
                "a two-handed weapon occupies both hands".to_string(),
            ));
        }

        let item = self.inventory.remove(index);
        let mut displaced = Vec::new();

        let slot = match item.kind {
            ItemKind::TwoHandedWeapon => {
                displaced.extend(self.equipment.remove(&EquipmentSlot::MainHand));
                displaced.extend(self.equipment.remove(&EquipmentSlot::OffHand));
                EquipmentSlot::MainHand
            }
            ItemKind::Ring => {
                let slot = if !self.equipment.contains_key(&EquipmentSlot::Ring1) {
                    EquipmentSlot::Ring1
                } else if !self.equipment.contains_key(&EquipmentSlot::Ring2) {
                    EquipmentSlot::Ring2
                } else {
                    EquipmentSlot::Ring1
                };
                displaced.extend(self.equipment.remove(&slot));
                slot
            }
            kind => {
                // Every other kind has a fixed slot
                let slot = kind.fixed_slot().unwrap_or(EquipmentSlot::MainHand);
                displaced.extend(self.equipment.remove(&slot));
                slot
            }
        };

        info!("{} equipped {} in {:?}", self.name, item.name, slot);
        self.equipment.insert(slot, item);
        self.inventory.extend(displaced);
        self.recalc_derived_stats();
        Ok(slot)
    }

    /// Moves the item in `slot` back to the inventory.
    pub fn unequip(&mut self, slot: EquipmentSlot) -> Result<(), ActionError> {
        let item = self.equipment.remove(&slot).ok_or(ActionError::EmptySlot)?;
        info!("{} unequipped {}", self.name, item.name);
        self.inventory.push(item);
        self.recalc_derived_stats();
        Ok(())
    }

    /// Spends scrap to add a bonus to the item in `slot`.
    pub fn enchant_item(
        &mut self,
        slot: EquipmentSlot,
        stat: Stat,
        value: i32,
        scrap_cost: u64,
    ) -> Result<(), ActionError> {
        let enchants = self
            .equipment
            .get(&slot)
            .map(|item| item.enchants)
            .ok_or(ActionError::EmptySlot)?;
        if enchants >= config::MAX_ENCHANTS_PER_ITEM {
            return Err(ActionError::MaxLevel);
        }
        if self.scrap < scrap_cost {
            return Err(ActionError::InsufficientScrap {
                needed: scrap_cost,
                available: self.scrap,
            });
        }

        self.scrap -= scrap_cost;
        if let Some(item) = self.equipment.get_mut(&slot) {
            *item.bonuses.entry(stat).or_insert(0) += value;
            item.enchants += 1;
        }
        self.recalc_derived_stats();
        Ok(())
    }

    /// Sells the inventory item at `index`, returning the gold gained.
    pub fn sell_item(&mut self, index: usize) -> Result<u64, ActionError> {
        if index >= self.inventory.len() {
            return Err(ActionError::NotInInventory);
        }
        let item = self.inventory.remove(index);
        self.gold += item.value;
        Ok(item.value)
    }

    pub fn add_to_inventory(&mut self, item: Item) {
        self.inventory.push(item);
    }

    pub fn inventory(&self) -> &[Item] {
        &self.inventory
    }

    pub fn equipped(&self, slot: EquipmentSlot) -> Option<&Item> {
        self.equipment.get(&slot)
    }

    pub fn equipment(&self) -> &std::collections::BTreeMap<EquipmentSlot, Item> {
        &self.equipment
    }

    /// Sum of a stat across all equipped items.
    pub fn equipment_bonus(&self, stat: Stat) -> i32 {
        self.equipment.values().map(|item| item.bonus(stat)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CharacterClass;

    fn hero() -> Character {
        Character::new("Hero", CharacterClass::Warrior)
    }

    fn index_of(hero: &Character, name: &str) -> usize {
        hero.inventory().iter().position(|i| i.name == name).unwrap()
    }

    #[test]
    fn test_two_hander_displaces_sword_and_shield() {
        let mut hero = hero();
        hero.add_to_inventory(Item::new("Sword", ItemKind::OneHandedWeapon));
        hero.add_to_inventory(Item::new("Shield", ItemKind::Shield));
        hero.add_to_inventory(Item::new("Greatsword", ItemKind::TwoHandedWeapon));

        hero.equip_from_inventory(index_of(&hero, "Sword")).unwrap();
        hero.equip_from_inventory(index_of(&hero, "Shield")).unwrap();
        hero.equip_from_inventory(index_of(&hero, "Greatsword")).unwrap();

        assert_eq!(hero.equipped(EquipmentSlot::MainHand).unwrap().name, "Greatsword");
        assert!(hero.equipped(EquipmentSlot::OffHand).is_none());
        let names: Vec<_> = hero.inventory().iter().map(|i| i.name.as_str()).collect();
        assert!(names.contains(&"Sword"));
        assert!(names.contains(&"Shield"));

        hero.unequip(EquipmentSlot::MainHand).unwrap();
        assert!(hero.equipped(EquipmentSlot::MainHand).is_none());
        assert!(hero.equipped(EquipmentSlot::OffHand).is_none());
        assert_eq!(hero.inventory().len(), 3);
    }

    #[test]
    fn test_shield_refused_with_two_hander() {
        let mut hero = hero();
        hero.add_to_inventory(Item::new("Greatsword", ItemKind::TwoHandedWeapon));
        hero.add_to_inventory(Item::new("Shield", ItemKind::Shield));
        hero.equip_from_inventory(0).unwrap();

        let result = hero.equip_from_inventory(0);
        assert!(matches!(result, Err(ActionError::SlotBlocked(_))));
        // Refused item stays in the inventory
        assert_eq!(hero.inventory()[0].name, "Shield");
    }

    #[test]
    fn test_one_hander_displaces_two_hander() {
        let mut hero = hero();
        hero.add_to_inventory(Item::new("Greatsword", ItemKind::TwoHandedWeapon));
        hero.add_to_inventory(Item::new("Dagger", ItemKind::OneHandedWeapon));
        hero.equip_from_inventory(0).unwrap();
        hero.equip_from_inventory(0).unwrap();

        assert_eq!(hero.equipped(EquipmentSlot::MainHand).unwrap().name, "Dagger");
        assert_eq!(hero.inventory()[0].name, "Greatsword");
    }

    #[test]
    fn test_rings_fill_then_replace_first() {
        let mut hero = hero();
        for name in ["A", "B", "C"] {
            hero.add_to_inventory(Item::new(name, ItemKind::Ring));
        }
        assert_eq!(hero.equip_from_inventory(0).unwrap(), EquipmentSlot::Ring1);
        assert_eq!(hero.equip_from_inventory(0).unwrap(), EquipmentSlot::Ring2);
        assert_eq!(hero.equip_from_inventory(0).unwrap(), EquipmentSlot::Ring1);

        assert_eq!(hero.equipped(EquipmentSlot::Ring1).unwrap().name, "C");
        assert_eq!(hero.equipped(EquipmentSlot::Ring2).unwrap().name, "B");
        assert_eq!(hero.inventory()[0].name, "A");
    }

    #[test]
    fn test_level_requirement() {
        let mut hero = hero();
        hero.add_to_inventory(Item::new("Crown", ItemKind::Helmet).with_required_level(10));
        assert_eq!(
            hero.equip_from_inventory(0),
            Err(ActionError::LevelTooLow { required: 10 })
        );
        assert_eq!(hero.inventory().len(), 1);
    }

    #[test]
    fn test_unequip_empty_slot() {
        let mut hero = hero();
        assert_eq!(hero.unequip(EquipmentSlot::Head), Err(ActionError::EmptySlot));
    }

    #[test]
    fn test_enchant_spends_scrap_and_caps() {
        let mut hero = hero();
        hero.add_scrap(100);
        hero.add_to_inventory(Item::new("Sword", ItemKind::OneHandedWeapon));
        hero.equip_from_inventory(0).unwrap();

        for _ in 0..config::MAX_ENCHANTS_PER_ITEM {
            hero.enchant_item(EquipmentSlot::MainHand, Stat::Damage, 2, 10)
                .unwrap();
        }
        assert_eq!(hero.scrap(), 70);
        assert_eq!(hero.equipment_bonus(Stat::Damage), 6);
        assert_eq!(
            hero.enchant_item(EquipmentSlot::MainHand, Stat::Damage, 2, 10),
            Err(ActionError::MaxLevel)
        );
        assert_eq!(hero.scrap(), 70);
    }

    #[test]
    fn test_equipment_changes_derived_health() {
        let mut hero = hero();
        let before = hero.max_health();
        hero.add_to_inventory(Item::new("Plate", ItemKind::ChestArmor).with_bonus(Stat::Health, 30));
        hero.equip_from_inventory(0).unwrap();
        assert_eq!(hero.max_health(), before + 30);
    }
}
